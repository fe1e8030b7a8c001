//! In-process test network for `auth-session`.
//!
//! Pairs a [`SessionStore`](auth_session::SessionStore) with a scriptable
//! [`MockAuthProvider`] and an [`EventRecorder`], so that whole sign-up and
//! sign-in flows can be driven without a real identity backend.

// Actual testnet exposed in the library
mod mock_provider;
mod recorder;
mod testnet;
pub use mock_provider::MockAuthProvider;
pub use recorder::EventRecorder;
pub use testnet::SessionTestnet;

// Re-export the core crate
pub use auth_session;
