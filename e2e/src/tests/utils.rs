use std::sync::Once;

use auth_session_testnet::{auth_session::ConfigToml, SessionTestnet};

static TRACING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(std::env::var("TRACING").unwrap_or_else(|_| "info".to_string()))
            // Use with_test_writer to ensure logs are captured correctly by the test runner.
            .with_test_writer()
            .init();
    });
}

/// A testnet with the production defaults: limits 3 and 5, 3000 ms cooldown.
pub async fn default_testnet() -> SessionTestnet {
    init_tracing();
    SessionTestnet::start_with_config(ConfigToml::default())
        .await
        .unwrap()
}
