//! Pure fold of [`SessionEvent`]s onto [`SessionState`].

use crate::{event::SessionEvent, state::SessionState};

/// Apply one event to a snapshot and return the next snapshot.
///
/// Total over every event kind; kinds that do not touch the session
/// (requests, rate-limit notices) return an unchanged copy.
#[must_use]
pub fn reduce(state: &SessionState, event: &SessionEvent) -> SessionState {
    match event {
        SessionEvent::SignUpStarted | SessionEvent::SignInStarted => SessionState {
            loading: true,
            error: None,
            ..state.clone()
        },
        SessionEvent::SignUpSucceeded { user } | SessionEvent::SignedIn { user } => SessionState {
            user: Some(user.clone()),
            loading: false,
            error: None,
        },
        SessionEvent::SignUpFailed { message } | SessionEvent::SignInFailed { message } => {
            SessionState {
                loading: false,
                error: Some(message.clone()),
                ..state.clone()
            }
        }
        SessionEvent::SignedOut => SessionState::signed_out(),
        SessionEvent::SignUpRequested(_)
        | SessionEvent::SignInRequested(_)
        | SessionEvent::SignUpLimitTimeout
        | SessionEvent::SignUpLimitError => state.clone(),
    }
}
