//! Configuration for the session coordinator.
//!
//! The documented defaults live in `config.default.toml`, embedded at
//! compile-time. Every section falls back to its default when a user file
//! leaves the section (or single keys) out.

use serde::{Deserialize, Serialize};
use std::{fmt, fs, num::NonZeroU32, path::Path, str::FromStr, time::Duration};
use tracing_subscriber::filter::{Directive, LevelFilter};

/// The documented default configuration. Parses to exactly [`ConfigToml::default`].
pub const DEFAULT_CONFIG: &str = include_str!("config.default.toml");

/// Error that can occur when reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigReadError {
    /// The file did not exist or could not be read.
    #[error("config file not found: {0}")]
    ConfigFileNotFound(#[from] std::io::Error),
    /// The TOML was syntactically invalid.
    #[error("config file is not valid TOML: {0}")]
    ConfigFileNotValid(#[from] toml::de::Error),
    /// The values parsed but contradict each other.
    #[error("config values are invalid: {0}")]
    Invalid(String),
}

/// Rate limit policy of the sign-up coordinator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SignupToml {
    /// Counter value that triggers `SignUpLimitTimeout` and the cooldown.
    pub soft_limit: NonZeroU32,
    /// Counter value that triggers `SignUpLimitError` and terminates the coordinator.
    pub hard_limit: NonZeroU32,
    /// Cooldown after the soft limit, in milliseconds.
    pub cooldown_ms: u64,
    /// Reset the counter once the cooldown elapsed.
    pub reset_after_cooldown: bool,
}

impl SignupToml {
    /// The cooldown as a [`Duration`].
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Event bus sizing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BusToml {
    /// Broadcast buffer per observer stream. Actor feeds are unbounded.
    pub capacity: usize,
}

/// Log filter settings, used by [`crate::logging::init_tracing_logs_with_config_if_set`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LoggingToml {
    /// Global level.
    #[serde(default)]
    pub level: LogLevel,
    /// Extra per-module directives, e.g. `auth_session=trace`.
    #[serde(default)]
    pub module_levels: Vec<TargetLevel>,
}

/// The overall configuration, composed of several subsections.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ConfigToml {
    /// Sign-up rate limit policy.
    #[serde(default)]
    pub signup: SignupToml,
    /// Event bus sizing.
    #[serde(default)]
    pub bus: BusToml,
    /// Logging. No subscriber is installed when absent.
    #[serde(default)]
    pub logging: Option<LoggingToml>,
}

impl Default for SignupToml {
    fn default() -> Self {
        Self {
            soft_limit: NonZeroU32::new(3).expect("Should always be > 0"),
            hard_limit: NonZeroU32::new(5).expect("Should always be > 0"),
            cooldown_ms: 3000,
            reset_after_cooldown: false,
        }
    }
}

impl Default for BusToml {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl ConfigToml {
    /// Read, parse and validate a configuration file.
    ///
    /// Sections and keys missing from the file keep their embedded defaults.
    ///
    /// # Errors
    /// - [`ConfigReadError::ConfigFileNotFound`] if the file cannot be read.
    /// - [`ConfigReadError::ConfigFileNotValid`] if it is not valid TOML.
    /// - [`ConfigReadError::Invalid`] if the values fail [`ConfigToml::validate`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigReadError> {
        let raw = fs::read_to_string(path)?;
        let config = ConfigToml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns [`ConfigReadError::Invalid`] when `soft_limit >= hard_limit`
    /// or when the bus capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigReadError> {
        if self.signup.soft_limit >= self.signup.hard_limit {
            return Err(ConfigReadError::Invalid(format!(
                "signup.soft_limit ({}) must be lower than signup.hard_limit ({})",
                self.signup.soft_limit, self.signup.hard_limit
            )));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigReadError::Invalid(
                "bus.capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Returns a default config tuned for unit tests: short cooldown, no logging.
    #[must_use]
    pub fn test() -> Self {
        let mut config = Self::default();
        config.signup.cooldown_ms = 100;
        config.logging = None;
        config
    }
}

impl FromStr for ConfigToml {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// A global log level such as `info` or `debug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogLevel(pub LevelFilter);

impl Default for LogLevel {
    fn default() -> Self {
        Self(LevelFilter::INFO)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .map(Self)
            .map_err(|_err| format!("invalid log level `{s}`"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl From<LogLevel> for Directive {
    fn from(level: LogLevel) -> Self {
        level.0.into()
    }
}

/// A per-target filter directive such as `auth_session::actors=trace`.
///
/// A bare level is rejected here; it belongs in [`LoggingToml::level`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetLevel(pub Directive);

impl FromStr for TargetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains('=') {
            return Err(format!(
                "invalid module level `{s}`, expected `target=level`"
            ));
        }
        s.parse()
            .map(Self)
            .map_err(|e| format!("invalid module level `{s}`: {e}"))
    }
}

impl fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<String> for TargetLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TargetLevel> for String {
    fn from(target: TargetLevel) -> Self {
        target.to_string()
    }
}

impl From<TargetLevel> for Directive {
    fn from(target: TargetLevel) -> Self {
        target.0
    }
}
