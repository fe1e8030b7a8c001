//! End-to-end scenarios for `auth-session`, run against the in-process testnet.

#[cfg(test)]
mod tests;
