//! Unified error types for the `auth-session` crate.
//!
//! Per-attempt failures ([`AuthError`], [`RateLimitError`]) never escape the
//! coordinator: they are folded into the session state or surfaced as events.
//! Only startup and lifecycle failures reach the caller through [`Error`].

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigReadError;

// --- Collaborator Errors ---

/// Failure reported by the auth provider for a sign-up or sign-in call.
///
/// Every variant carries the human-readable message that ends up in
/// [`crate::SessionState::error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider refused the credentials (bad password, malformed email, ...).
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The provider could not be reached or the call timed out.
    #[error("Network failure: {0}")]
    Network(String),

    /// The provider rejected the request for any other reason (account exists, disabled, ...).
    #[error("Rejected by provider: {0}")]
    Rejected(String),
}

impl AuthError {
    /// The bare message, without the category prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            AuthError::InvalidCredentials(m) | AuthError::Network(m) | AuthError::Rejected(m) => m,
        }
    }

    /// Returns true if the error is transient and the same request might succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }
}

/// The provider's push channel could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to subscribe to auth changes: {reason}")]
pub struct SubscribeError {
    /// Short description of why the provider refused the subscription.
    pub reason: String,
}

impl SubscribeError {
    /// Create a new subscription error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// --- Rate Limit Outcomes ---

/// Why the sign-up coordinator refused to run a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The soft limit was hit. Requests resume after the cooldown.
    #[error("Sign-up soft limit reached after {tries} tries, cooling down for {cooldown:?}")]
    Soft {
        /// Counter value that triggered the limit.
        tries: u32,
        /// How long the coordinator suspends before taking the next request.
        cooldown: Duration,
    },

    /// The hard limit was hit. The coordinator stops serving sign-ups.
    #[error("Sign-up hard limit reached after {tries} tries")]
    Hard {
        /// Counter value that triggered the limit.
        tries: u32,
    },

    /// The hard limit was hit earlier; the request is dropped.
    #[error("Sign-up coordinator is terminated")]
    Terminated,
}

// --- The Main Operational Error Enum ---

/// The crate’s top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider's auth-change channel could not be opened at startup.
    #[error("Auth channel unavailable: {0}")]
    Subscription(#[from] SubscribeError),

    /// Configuration could not be read or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigReadError),

    /// The store was shut down; events can no longer be dispatched.
    #[error("Session store is closed")]
    Closed,
}

/// A specialized `Result` type for `auth-session` operations.
pub type Result<T> = std::result::Result<T, Error>;
