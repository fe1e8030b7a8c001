//! The session record and its read-only projections.

use serde::{Deserialize, Serialize};

/// The signed-in principal as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Provider-assigned stable user id.
    pub uid: String,
    /// Email address, when the provider exposes one.
    pub email: Option<String>,
}

impl UserIdentity {
    /// Create an identity with an email address.
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
        }
    }

    /// Create an identity without an email address.
    pub fn anonymous(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }
}

/// The single authoritative snapshot of the current auth status.
///
/// Snapshots are immutable. The reducer produces a new one for every event
/// and the store swaps it in atomically, so readers holding an older
/// snapshot never see it change underneath them.
///
/// Invariant: `error.is_some()` implies `!loading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The signed-in user, if any.
    pub user: Option<UserIdentity>,
    /// True while a sign-up or sign-in attempt is in flight, and at startup
    /// until the provider reports the initial auth status.
    pub loading: bool,
    /// Message of the last failed attempt. Cleared when a new attempt starts.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }
}

impl SessionState {
    /// The state right after the provider reported "nobody is signed in".
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
            error: None,
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    /// Whether an attempt is in flight (or the initial auth check is pending).
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}
