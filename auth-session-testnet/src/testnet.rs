use std::sync::Arc;

use auth_session::{ConfigToml, SessionHandle, SessionStore};

use crate::{EventRecorder, MockAuthProvider};

/// A session store wired to a [`MockAuthProvider`].
///
/// [`SessionTestnet::start`] returns once the initial auth check has resolved,
/// so the store is no longer loading and the rate limiter is untouched.
pub struct SessionTestnet {
    provider: Arc<MockAuthProvider>,
    store: SessionStore,
}

impl SessionTestnet {
    /// Run a store with the default configuration.
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_config(ConfigToml::default()).await
    }

    /// Run a store with `config`.
    pub async fn start_with_config(config: ConfigToml) -> anyhow::Result<Self> {
        Self::start_with_provider(MockAuthProvider::new(), config).await
    }

    /// Run a store around an already prepared provider.
    ///
    /// The provider must report the initial auth status on subscribe, or this waits forever.
    pub async fn start_with_provider(
        provider: Arc<MockAuthProvider>,
        config: ConfigToml,
    ) -> anyhow::Result<Self> {
        let store = SessionStore::builder(provider.clone())
            .config(config)
            .start()?;
        store.wait_for(|state| !state.loading).await?;
        tracing::debug!("Session testnet ready");
        Ok(Self { provider, store })
    }

    /// The mock provider behind the store.
    pub fn provider(&self) -> &Arc<MockAuthProvider> {
        &self.provider
    }

    /// A cloneable handle on the store.
    pub fn handle(&self) -> SessionHandle {
        self.store.handle()
    }

    /// Start recording the events applied from now on.
    pub fn recorder(&self) -> EventRecorder {
        EventRecorder::start(&self.store)
    }
}
