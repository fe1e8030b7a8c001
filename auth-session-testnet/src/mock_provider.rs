use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use auth_session::{
    AuthChangeCallback, AuthError, AuthProvider, SubscribeError, Unsubscribe, UserIdentity,
};

type Listener = Arc<dyn Fn(Option<UserIdentity>) + Send + Sync>;

#[derive(Default)]
struct Inner {
    available: bool,
    push_on_subscribe: bool,
    current: Option<UserIdentity>,
    listeners: HashMap<u64, Listener>,
    next_listener_id: u64,
    sign_up_script: VecDeque<Result<UserIdentity, AuthError>>,
    sign_in_script: VecDeque<Result<UserIdentity, AuthError>>,
    sign_up_emails: Vec<String>,
    sign_in_emails: Vec<String>,
    sign_up_latency: Duration,
    sign_in_latency: Duration,
}

/// A scriptable in-memory [`AuthProvider`].
///
/// - Sign-up and sign-in outcomes are taken from a FIFO script. Once the
///   script is exhausted every call succeeds with `uid-<email>`.
/// - Every call is counted on entry, before the configured latency elapses,
///   so tests can observe calls that are still in flight.
/// - Auth changes are pushed with [`Self::push`] and delivered synchronously
///   to every live listener.
pub struct MockAuthProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockAuthProvider {
    fn with(available: bool, push_on_subscribe: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Mutex::new(Inner {
                available,
                push_on_subscribe,
                ..Inner::default()
            })),
        })
    }

    /// A provider that reports the current user (initially nobody) to each
    /// new subscriber right away, like most hosted identity services do.
    pub fn new() -> Arc<Self> {
        Self::with(true, true)
    }

    /// A provider that stays silent until the first [`Self::push`].
    pub fn silent() -> Arc<Self> {
        Self::with(true, false)
    }

    /// A provider whose auth channel cannot be opened.
    pub fn unavailable() -> Arc<Self> {
        Self::with(false, false)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report an auth change to every listener.
    pub fn push(&self, user: Option<UserIdentity>) {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.current.clone_from(&user);
            inner.listeners.values().cloned().collect()
        };
        tracing::debug!(?user, listeners = listeners.len(), "Pushing auth change");
        for listener in listeners {
            listener(user.clone());
        }
    }

    /// Shorthand for `push(None)`.
    pub fn sign_out(&self) {
        self.push(None);
    }

    /// Queue outcomes for the next sign-up calls.
    pub fn script_sign_up(&self, outcomes: impl IntoIterator<Item = Result<UserIdentity, AuthError>>) {
        self.lock().sign_up_script.extend(outcomes);
    }

    /// Queue outcomes for the next sign-in calls.
    pub fn script_sign_in(&self, outcomes: impl IntoIterator<Item = Result<UserIdentity, AuthError>>) {
        self.lock().sign_in_script.extend(outcomes);
    }

    /// Fail the next `count` sign-ups with the same error.
    pub fn fail_sign_ups(&self, count: usize, error: AuthError) {
        self.script_sign_up(std::iter::repeat_n(Err(error), count));
    }

    /// Delay applied to every sign-up call.
    pub fn set_sign_up_latency(&self, latency: Duration) {
        self.lock().sign_up_latency = latency;
    }

    /// Delay applied to every sign-in call.
    pub fn set_sign_in_latency(&self, latency: Duration) {
        self.lock().sign_in_latency = latency;
    }

    /// Number of sign-up calls received so far.
    pub fn sign_up_calls(&self) -> usize {
        self.lock().sign_up_emails.len()
    }

    /// Number of sign-in calls received so far.
    pub fn sign_in_calls(&self) -> usize {
        self.lock().sign_in_emails.len()
    }

    /// Emails passed to sign-up, in call order.
    pub fn sign_up_emails(&self) -> Vec<String> {
        self.lock().sign_up_emails.clone()
    }

    /// Emails passed to sign-in, in call order.
    pub fn sign_in_emails(&self) -> Vec<String> {
        self.lock().sign_in_emails.clone()
    }

    /// Number of live auth change listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

fn default_user(email: &str) -> UserIdentity {
    UserIdentity::new(format!("uid-{email}"), email)
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<UserIdentity, AuthError> {
        let (outcome, latency) = {
            let mut inner = self.lock();
            inner.sign_up_emails.push(email.to_string());
            let outcome = inner
                .sign_up_script
                .pop_front()
                .unwrap_or_else(|| Ok(default_user(email)));
            (outcome, inner.sign_up_latency)
        };
        tokio::time::sleep(latency).await;
        tracing::debug!(email, ok = outcome.is_ok(), "Mock sign-up");
        outcome
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<UserIdentity, AuthError> {
        let (outcome, latency) = {
            let mut inner = self.lock();
            inner.sign_in_emails.push(email.to_string());
            let outcome = inner
                .sign_in_script
                .pop_front()
                .unwrap_or_else(|| Ok(default_user(email)));
            (outcome, inner.sign_in_latency)
        };
        tokio::time::sleep(latency).await;
        tracing::debug!(email, ok = outcome.is_ok(), "Mock sign-in");
        outcome
    }

    fn on_auth_change(&self, callback: AuthChangeCallback) -> Result<Unsubscribe, SubscribeError> {
        let listener: Listener = Arc::from(callback);
        let (id, initial) = {
            let mut inner = self.lock();
            if !inner.available {
                return Err(SubscribeError::new("mock provider is unavailable"));
            }
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.insert(id, Arc::clone(&listener));
            (id, inner.push_on_subscribe.then(|| inner.current.clone()))
        };
        if let Some(user) = initial {
            listener(user);
        }

        let inner = Arc::clone(&self.inner);
        Ok(Unsubscribe::new(move || {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&id);
        }))
    }
}
