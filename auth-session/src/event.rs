//! Events driving every session state change.

use std::fmt;

use crate::state::UserIdentity;

/// Email and password carried by a sign-up or sign-in request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password, handed to the provider as is.
    pub password: String,
}

impl Credentials {
    /// Bundle an email and a password.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A discrete, immutable event on the session bus.
///
/// Events are totally ordered by the order in which they were enqueued on a
/// given store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A caller asked for a new account.
    SignUpRequested(Credentials),
    /// The coordinator is about to call the provider.
    SignUpStarted,
    /// The provider created the account.
    SignUpSucceeded {
        /// The new principal.
        user: UserIdentity,
    },
    /// The provider refused or failed the sign-up.
    SignUpFailed {
        /// Human-readable reason.
        message: String,
    },
    /// The soft limit was hit; sign-ups pause for the cooldown.
    SignUpLimitTimeout,
    /// The hard limit was hit; no further sign-ups are served.
    SignUpLimitError,
    /// A caller asked to sign in to an existing account.
    SignInRequested(Credentials),
    /// A sign-in worker is about to call the provider.
    SignInStarted,
    /// The provider refused or failed the sign-in.
    SignInFailed {
        /// Human-readable reason.
        message: String,
    },
    /// A user is signed in, either pushed by the provider or returned by a sign-in.
    SignedIn {
        /// The signed-in principal.
        user: UserIdentity,
    },
    /// The provider reported that nobody is signed in.
    SignedOut,
}

/// Payload-free discriminant of a [`SessionEvent`], used to select events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`SessionEvent::SignUpRequested`].
    SignUpRequested,
    /// See [`SessionEvent::SignUpStarted`].
    SignUpStarted,
    /// See [`SessionEvent::SignUpSucceeded`].
    SignUpSucceeded,
    /// See [`SessionEvent::SignUpFailed`].
    SignUpFailed,
    /// See [`SessionEvent::SignUpLimitTimeout`].
    SignUpLimitTimeout,
    /// See [`SessionEvent::SignUpLimitError`].
    SignUpLimitError,
    /// See [`SessionEvent::SignInRequested`].
    SignInRequested,
    /// See [`SessionEvent::SignInStarted`].
    SignInStarted,
    /// See [`SessionEvent::SignInFailed`].
    SignInFailed,
    /// See [`SessionEvent::SignedIn`].
    SignedIn,
    /// See [`SessionEvent::SignedOut`].
    SignedOut,
}

impl SessionEvent {
    /// Shorthand for a sign-up request.
    pub fn sign_up(email: impl Into<String>, password: impl Into<String>) -> Self {
        SessionEvent::SignUpRequested(Credentials::new(email, password))
    }

    /// Shorthand for a sign-in request.
    pub fn sign_in(email: impl Into<String>, password: impl Into<String>) -> Self {
        SessionEvent::SignInRequested(Credentials::new(email, password))
    }

    /// The discriminant of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            SessionEvent::SignUpRequested(_) => EventKind::SignUpRequested,
            SessionEvent::SignUpStarted => EventKind::SignUpStarted,
            SessionEvent::SignUpSucceeded { .. } => EventKind::SignUpSucceeded,
            SessionEvent::SignUpFailed { .. } => EventKind::SignUpFailed,
            SessionEvent::SignUpLimitTimeout => EventKind::SignUpLimitTimeout,
            SessionEvent::SignUpLimitError => EventKind::SignUpLimitError,
            SessionEvent::SignInRequested(_) => EventKind::SignInRequested,
            SessionEvent::SignInStarted => EventKind::SignInStarted,
            SessionEvent::SignInFailed { .. } => EventKind::SignInFailed,
            SessionEvent::SignedIn { .. } => EventKind::SignedIn,
            SessionEvent::SignedOut => EventKind::SignedOut,
        }
    }

    /// The request payload, for the two request kinds.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        match self {
            SessionEvent::SignUpRequested(c) | SessionEvent::SignInRequested(c) => Some(c),
            _ => None,
        }
    }

    /// Events that callers outside the store are expected to react to
    /// (rate-limit feedback and provider-driven auth changes).
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::SignUpLimitTimeout
                | EventKind::SignUpLimitError
                | EventKind::SignedIn
                | EventKind::SignedOut
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
