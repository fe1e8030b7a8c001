//! Sign-in worker, supervised by [`crate::run_latest`] so that a newer
//! request supersedes a stale one still waiting on the provider.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{bus::EventBus, event::SessionEvent, provider::AuthProvider, session_log};

/// Serve one `SignInRequested` event.
///
/// Emits `SignInStarted`, then either `SignedIn` or `SignInFailed`. Once
/// `cancel` fires the pending provider call is abandoned and nothing more is
/// emitted; the terminal event is a single bus message, so it either lands
/// before cancellation or not at all.
pub(crate) async fn sign_in_worker(
    provider: Arc<dyn AuthProvider>,
    bus: EventBus,
    event: SessionEvent,
    cancel: CancellationToken,
) {
    let SessionEvent::SignInRequested(credentials) = event else {
        return;
    };
    if cancel.is_cancelled() || bus.put(SessionEvent::SignInStarted).await.is_err() {
        return;
    }

    session_log!(info, "Signing in {}", credentials.email);
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            session_log!(debug, "Sign-in of {} superseded, discarding result", credentials.email);
            return;
        }
        outcome = provider.sign_in(&credentials.email, &credentials.password) => outcome,
    };

    let event = match outcome {
        Ok(user) => SessionEvent::SignedIn { user },
        Err(e) => {
            session_log!(
                warn,
                "Sign-in of {} failed (retryable: {}): {}",
                credentials.email,
                e.is_retryable(),
                e
            );
            SessionEvent::SignInFailed {
                message: e.message().to_owned(),
            }
        }
    };
    if cancel.is_cancelled() {
        return;
    }
    let _ = bus.put(event).await;
}
