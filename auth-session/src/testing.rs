//! Crate-private scripted provider for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    errors::{AuthError, SubscribeError},
    provider::{AuthChangeCallback, AuthProvider, Unsubscribe},
    state::UserIdentity,
};

type Listener = Arc<dyn Fn(Option<UserIdentity>) + Send + Sync>;

#[derive(Default)]
struct Inner {
    available: bool,
    push_on_subscribe: bool,
    current: Option<UserIdentity>,
    listeners: HashMap<u64, Listener>,
    next_id: u64,
    sign_up_script: VecDeque<Result<UserIdentity, AuthError>>,
    sign_in_script: VecDeque<Result<UserIdentity, AuthError>>,
    sign_up_calls: usize,
    sign_in_calls: usize,
    sign_up_latency: Duration,
    sign_in_latency: Duration,
}

pub(crate) struct ScriptedProvider {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedProvider {
    fn with(available: bool, push_on_subscribe: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Mutex::new(Inner {
                available,
                push_on_subscribe,
                ..Inner::default()
            })),
        })
    }

    /// Reports "signed out" as soon as someone subscribes.
    pub(crate) fn new() -> Arc<Self> {
        Self::with(true, true)
    }

    /// Never reports anything until [`Self::push`] is called.
    pub(crate) fn silent() -> Arc<Self> {
        Self::with(true, false)
    }

    /// Refuses subscriptions.
    pub(crate) fn unavailable() -> Arc<Self> {
        Self::with(false, false)
    }

    pub(crate) fn push(&self, user: Option<UserIdentity>) {
        let listeners: Vec<Listener> = {
            let mut inner = self.inner.lock().unwrap();
            inner.current = user.clone();
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(user.clone());
        }
    }

    pub(crate) fn script_sign_up(
        &self,
        outcomes: impl IntoIterator<Item = Result<UserIdentity, AuthError>>,
    ) {
        self.inner.lock().unwrap().sign_up_script.extend(outcomes);
    }

    pub(crate) fn script_sign_in(
        &self,
        outcomes: impl IntoIterator<Item = Result<UserIdentity, AuthError>>,
    ) {
        self.inner.lock().unwrap().sign_in_script.extend(outcomes);
    }

    pub(crate) fn set_sign_up_latency(&self, latency: Duration) {
        self.inner.lock().unwrap().sign_up_latency = latency;
    }

    pub(crate) fn set_sign_in_latency(&self, latency: Duration) {
        self.inner.lock().unwrap().sign_in_latency = latency;
    }

    pub(crate) fn sign_up_calls(&self) -> usize {
        self.inner.lock().unwrap().sign_up_calls
    }

    pub(crate) fn sign_in_calls(&self) -> usize {
        self.inner.lock().unwrap().sign_in_calls
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }
}

fn default_user(email: &str) -> UserIdentity {
    UserIdentity::new(format!("uid-{email}"), email)
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<UserIdentity, AuthError> {
        let (outcome, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.sign_up_calls += 1;
            let outcome = inner
                .sign_up_script
                .pop_front()
                .unwrap_or_else(|| Ok(default_user(email)));
            (outcome, inner.sign_up_latency)
        };
        tokio::time::sleep(latency).await;
        outcome
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<UserIdentity, AuthError> {
        let (outcome, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.sign_in_calls += 1;
            let outcome = inner
                .sign_in_script
                .pop_front()
                .unwrap_or_else(|| Ok(default_user(email)));
            (outcome, inner.sign_in_latency)
        };
        tokio::time::sleep(latency).await;
        outcome
    }

    fn on_auth_change(&self, callback: AuthChangeCallback) -> Result<Unsubscribe, SubscribeError> {
        let listener: Listener = Arc::from(callback);
        let (id, initial) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.available {
                return Err(SubscribeError::new("provider unavailable"));
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, Arc::clone(&listener));
            (id, inner.push_on_subscribe.then(|| inner.current.clone()))
        };
        if let Some(user) = initial {
            listener(user);
        }
        let inner = Arc::clone(&self.inner);
        Ok(Unsubscribe::new(move || {
            if let Ok(mut inner) = inner.lock() {
                inner.listeners.remove(&id);
            }
        }))
    }
}
