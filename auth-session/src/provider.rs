//! The narrow interface to the external auth provider.
//!
//! The store never talks to the network itself. Everything it needs from the
//! outside world goes through [`AuthProvider`]: two request/response calls
//! and one push channel.

use std::fmt;

use async_trait::async_trait;

use crate::{
    errors::{AuthError, SubscribeError},
    state::UserIdentity,
};

/// Callback invoked by the provider on every auth change. `None` means signed out.
pub type AuthChangeCallback = Box<dyn Fn(Option<UserIdentity>) + Send + Sync>;

/// External authentication backend.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Create an account and return its identity.
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;

    /// Sign in to an existing account and return its identity.
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;

    /// Register `callback` for auth changes.
    ///
    /// Providers are expected to report the current status once right after
    /// subscribing, which is what resolves the store's initial `loading`
    /// state. The callback must be released when the returned guard drops.
    ///
    /// # Errors
    /// Returns [`SubscribeError`] if the push channel is unavailable.
    fn on_auth_change(&self, callback: AuthChangeCallback) -> Result<Unsubscribe, SubscribeError>;
}

/// Guard returned by [`AuthProvider::on_auth_change`].
///
/// Dropping it (or calling [`Unsubscribe::release`]) detaches the callback
/// from the provider exactly once.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct Unsubscribe {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    /// Wrap the provider's release function.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Detach now instead of on drop.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let guard = Unsubscribe::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(guard);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release_does_not_run_twice() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let guard = Unsubscribe::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        guard.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
