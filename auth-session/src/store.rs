//! The session store: reducer task, actor wiring and the public read/dispatch surface.

use std::{ops::Deref, sync::Arc};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    actors::{
        auth_channel::AuthChannel,
        dispatch::run_latest,
        signin::sign_in_worker,
        signup::SignUpCoordinator,
    },
    bus::{Envelope, EventBus, EventStream},
    config::ConfigToml,
    errors::{Error, Result},
    event::{EventKind, SessionEvent},
    provider::AuthProvider,
    reducer::reduce,
    session_log,
    state::{SessionState, UserIdentity},
};

/// Read and dispatch surface of a running [`SessionStore`].
///
/// Cheap to clone and thread-safe. Every clone talks to the same reducer,
/// so all of them observe the same sequence of snapshots.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    bus: EventBus,
    state: watch::Receiver<Arc<SessionState>>,
}

impl SessionHandle {
    /// Enqueue any event. The reducer applies events in enqueue order.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store was shut down.
    pub fn dispatch(&self, event: SessionEvent) -> Result<()> {
        session_log!(debug, "Dispatching {}", event.kind());
        self.bus.dispatch(event)
    }

    /// Request a new account. The outcome arrives as events and in [`Self::state`].
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store was shut down.
    pub fn sign_up(&self, email: impl Into<String>, password: impl Into<String>) -> Result<()> {
        self.dispatch(SessionEvent::sign_up(email, password))
    }

    /// Request a sign-in. A newer request supersedes one still in flight.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store was shut down.
    pub fn sign_in(&self, email: impl Into<String>, password: impl Into<String>) -> Result<()> {
        self.dispatch(SessionEvent::sign_in(email, password))
    }

    /// The current immutable snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state.borrow())
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state().user.clone()
    }

    /// Whether an attempt is in flight or the initial auth check is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Message of the last failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Observe every event applied from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.bus.subscribe()
    }

    /// Wait until a snapshot satisfies `predicate` and return it.
    ///
    /// Resolves immediately if the current snapshot already does.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store shuts down first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionState) -> bool,
    ) -> Result<Arc<SessionState>> {
        let mut state = self.state.clone();
        let snapshot = state
            .wait_for(|snapshot| predicate(snapshot.as_ref()))
            .await
            .map_err(|_err| Error::Closed)?;
        Ok(Arc::clone(&snapshot))
    }

    /// The underlying bus, for wiring custom actors with the dispatch combinators.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }
}

/// The session coordinator: session state plus the actors that drive it.
///
/// Owns four tasks:
/// - the reducer, sole writer of the [`SessionState`];
/// - the auth channel adapter, turning provider pushes into `SignedIn`/`SignedOut`;
/// - the sign-up coordinator, serving `SignUpRequested` under the rate limit;
/// - the sign-in supervisor, serving `SignInRequested` with cancel-on-supersede.
///
/// Dropping the store stops every task and releases the provider subscription.
///
/// # Examples
/// ```no_run
/// # use std::sync::Arc;
/// # use auth_session::{AuthProvider, ConfigToml, SessionStore};
/// # async fn run(provider: Arc<dyn AuthProvider>) -> auth_session::Result<()> {
/// let store = SessionStore::builder(provider)
///     .config(ConfigToml::default())
///     .start()?;
///
/// store.wait_for(|s| !s.loading).await?; // initial auth check resolved
/// store.sign_up("alice@example.com", "correct horse")?;
/// let state = store.wait_for(|s| s.user.is_some() || s.error.is_some()).await?;
/// println!("{state:?}");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct SessionStore {
    handle: SessionHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionStore {
    /// Create a builder around the auth provider.
    pub fn builder(provider: Arc<dyn AuthProvider>) -> SessionStoreBuilder {
        SessionStoreBuilder::new(provider)
    }

    /// Start with the default configuration.
    ///
    /// # Errors
    /// Returns [`Error::Subscription`] if the provider's auth channel is unavailable.
    pub fn start(provider: Arc<dyn AuthProvider>) -> Result<Self> {
        Self::builder(provider).start()
    }

    /// A cloneable handle with the read and dispatch surface.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop every task and release the provider subscription.
    pub fn shutdown(self) {
        // Drop does the work.
    }
}

impl Deref for SessionStore {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        session_log!(info, "Shutting down session store");
        for task in &self.tasks {
            task.abort();
        }
        self.handle.bus.close();
    }
}

/// Builder for [`SessionStore`].
pub struct SessionStoreBuilder {
    provider: Arc<dyn AuthProvider>,
    config: ConfigToml,
}

impl std::fmt::Debug for SessionStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStoreBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionStoreBuilder {
    pub(crate) fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            config: ConfigToml::default(),
        }
    }

    /// Override the configuration.
    #[must_use]
    pub fn config(mut self, config: ConfigToml) -> Self {
        self.config = config;
        self
    }

    /// Validate the config, open the auth channel and spawn every task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - Returns [`Error::Config`] if the configuration fails validation.
    /// - Returns [`Error::Subscription`] if the provider's auth channel is
    ///   unavailable. Nothing is spawned in that case and the failure is not retried.
    pub fn start(self) -> Result<SessionStore> {
        self.config.validate()?;

        let channel = AuthChannel::open(self.provider.as_ref()).map_err(|e| {
            session_log!(error, "Auth channel unavailable: {}", e);
            e
        })?;

        let (bus, envelopes) = EventBus::new(self.config.bus.capacity);
        let (state_tx, state_rx) = watch::channel(Arc::new(SessionState::default()));

        // Feed every actor before the reducer can publish anything.
        let signup_requests = bus.feed(EventKind::SignUpRequested);
        let provider = Arc::clone(&self.provider);
        let worker_bus = bus.clone();
        let signin = run_latest(&bus, EventKind::SignInRequested, move |event, cancel| {
            sign_in_worker(Arc::clone(&provider), worker_bus.clone(), event, cancel)
        });

        let reducer = tokio::spawn(reduce_loop(envelopes, state_tx, bus.clone()));
        let adapter = tokio::spawn(channel.run(bus.clone()));

        let coordinator = SignUpCoordinator::new(
            Arc::clone(&self.provider),
            bus.clone(),
            state_rx.clone(),
            &self.config.signup,
        );
        let signup = tokio::spawn(coordinator.run(signup_requests));

        session_log!(info, "Session store started");
        Ok(SessionStore {
            handle: SessionHandle {
                bus,
                state: state_rx,
            },
            tasks: vec![reducer, adapter, signup, signin],
        })
    }
}

/// The single writer of the session state.
async fn reduce_loop(
    mut envelopes: mpsc::UnboundedReceiver<Envelope>,
    state: watch::Sender<Arc<SessionState>>,
    bus: EventBus,
) {
    while let Some(Envelope { event, applied }) = envelopes.recv().await {
        state.send_if_modified(|current| {
            let next = reduce(current, &event);
            if next == **current {
                return false;
            }
            *current = Arc::new(next);
            true
        });
        bus.publish(event);
        if let Some(applied) = applied {
            let _ = applied.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn initial_push_resolves_loading() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::start(provider.clone()).unwrap();

        let state = store.wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(*state, SessionState::signed_out());
    }

    #[tokio::test]
    async fn unavailable_provider_fails_startup() {
        let provider = ScriptedProvider::unavailable();
        let err = SessionStore::start(provider).unwrap_err();
        assert!(matches!(err, Error::Subscription(_)));
    }

    #[tokio::test]
    async fn invalid_config_fails_startup() {
        let mut config = ConfigToml::test();
        config.bus.capacity = 0;
        let err = SessionStore::builder(ScriptedProvider::new())
            .config(config)
            .start()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn snapshots_are_immutable() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::start(provider.clone()).unwrap();
        let before = store.wait_for(|s| !s.loading).await.unwrap();

        provider.push(Some(UserIdentity::new("u1", "a@b.c")));
        let after = store.wait_for(|s| s.user.is_some()).await.unwrap();

        assert_eq!(before.user, None, "old snapshot unchanged");
        assert_eq!(after.user, Some(UserIdentity::new("u1", "a@b.c")));
        assert_eq!(store.current_user(), after.user);
    }

    #[tokio::test]
    async fn shutdown_releases_subscription_and_closes() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::start(provider.clone()).unwrap();
        store.wait_for(|s| !s.loading).await.unwrap();
        let handle = store.handle();
        let mut events = handle.subscribe();
        assert_eq!(provider.listener_count(), 1);

        store.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(provider.listener_count(), 0);
        while events.recv().await.is_some() {}
        assert!(handle.bus().is_closed());
        assert!(matches!(handle.sign_up("a@b.c", "pw"), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn dispatch_reaches_subscribers_after_reduce() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::start(provider).unwrap();
        store.wait_for(|s| !s.loading).await.unwrap();
        let mut events = store.subscribe();

        store
            .dispatch(SessionEvent::SignUpFailed {
                message: "synthetic".into(),
            })
            .unwrap();

        let event = events.next_of(EventKind::SignUpFailed).await.unwrap();
        assert_eq!(
            event,
            SessionEvent::SignUpFailed {
                message: "synthetic".into()
            }
        );
        assert_eq!(store.last_error().as_deref(), Some("synthetic"));
    }
}
