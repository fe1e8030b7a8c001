//! Bridges the provider's push notifications into bus events.

use crate::{
    bus::EventBus,
    errors::SubscribeError,
    event::SessionEvent,
    provider::{AuthProvider, Unsubscribe},
    session_log,
    state::UserIdentity,
};

/// Adapter owning the provider subscription for its whole lifetime.
///
/// The provider callback only forwards into a channel; translation into
/// events happens in [`AuthChannel::run`]. When the adapter stops (or its
/// task is aborted) the [`Unsubscribe`] guard drops and the provider releases
/// the callback, so no callback outlives the adapter.
#[derive(Debug)]
pub(crate) struct AuthChannel {
    pushes: flume::Receiver<Option<UserIdentity>>,
    subscription: Unsubscribe,
}

impl AuthChannel {
    /// Subscribe to the provider. Failure is fatal and never retried here.
    pub(crate) fn open(provider: &dyn AuthProvider) -> Result<Self, SubscribeError> {
        let (tx, pushes) = flume::unbounded();
        let subscription = provider.on_auth_change(Box::new(move |user| {
            // The adapter is gone when this fails; nothing left to notify.
            let _ = tx.send(user);
        }))?;
        session_log!(info, "Subscribed to provider auth changes");
        Ok(Self {
            pushes,
            subscription,
        })
    }

    /// Emit one `SignedIn`/`SignedOut` per push, in push order.
    pub(crate) async fn run(self, bus: EventBus) {
        let Self {
            pushes,
            subscription,
        } = self;

        while let Ok(user) = pushes.recv_async().await {
            let event = match user {
                Some(user) => {
                    session_log!(info, "Provider reports {} signed in", user.uid);
                    SessionEvent::SignedIn { user }
                }
                None => {
                    session_log!(info, "Provider reports signed out");
                    SessionEvent::SignedOut
                }
            };
            if bus.put(event).await.is_err() {
                break;
            }
        }

        session_log!(debug, "Auth channel adapter stopped");
        subscription.release();
    }
}
