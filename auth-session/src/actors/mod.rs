//! Long-lived tasks that react to bus events.

pub(crate) mod auth_channel;
pub mod dispatch;
pub(crate) mod signin;
pub mod signup;

pub use dispatch::{run_every, run_latest};
pub use signup::{RateLimiter, SignUpPhase};
