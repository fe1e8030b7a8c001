//!
//! Module to initialize tracing logs.
//!
//! Logs are initialized from the `[logging]` section of the config. Call this
//! before starting a [`crate::SessionStore`] so that startup failures (for
//! example an unavailable auth channel) are not missed.
//!

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigToml, LoggingToml};

/// Initialize the tracing logger based on the `[logging]` section of the config.
///
/// Does nothing when the section is absent. `RUST_LOG`, when set, takes
/// precedence over the configured levels.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_tracing_logs_with_config_if_set(config: &ConfigToml) -> anyhow::Result<()> {
    let Some(logging) = &config.logging else {
        return Ok(());
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(logging));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Global level first, then each module directive on top.
fn configured_filter(logging: &LoggingToml) -> EnvFilter {
    logging.module_levels.iter().cloned().fold(
        EnvFilter::new("").add_directive(logging.level.clone().into()),
        |filter, target| filter.add_directive(target.into()),
    )
}
