//! Authentication session coordinator.
//!
//! Reconciles three independent event sources into one consistent
//! [`SessionState`]:
//! - user-initiated sign-up and sign-in requests,
//! - a tries-based sign-up rate limit with cooldown and hard stop,
//! - auth changes pushed by the external [`AuthProvider`].
//!
//! Every change flows through a single ordered [`EventBus`] and a pure
//! [`reduce`] function applied by one task, so there is exactly one writer of
//! the session state and readers always see whole snapshots.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use auth_session::{AuthProvider, EventKind, SessionStore};
//! # async fn run(provider: Arc<dyn AuthProvider>) -> auth_session::Result<()> {
//! let store = SessionStore::start(provider)?;
//! let mut events = store.subscribe();
//!
//! store.sign_up("alice@example.com", "correct horse")?;
//! if let Some(event) = events.next_of(EventKind::SignUpLimitTimeout).await {
//!     println!("slow down: {event:?}");
//! }
//! # Ok(()) }
//! ```
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod macros;

pub mod actors;
pub mod bus;
pub mod config;
pub mod errors;
pub mod event;
pub mod logging;
pub mod provider;
pub mod reducer;
pub mod state;
mod store;

#[cfg(test)]
mod testing;

// --- PUBLIC API EXPORTS ---
pub use actors::{run_every, run_latest, RateLimiter, SignUpPhase};
pub use bus::{EventBus, EventFeed, EventStream};
pub use config::{ConfigReadError, ConfigToml};
pub use errors::{AuthError, Error, RateLimitError, Result, SubscribeError};
pub use event::{Credentials, EventKind, SessionEvent};
pub use logging::init_tracing_logs_with_config_if_set;
pub use provider::{AuthChangeCallback, AuthProvider, Unsubscribe};
pub use reducer::reduce;
pub use state::{SessionState, UserIdentity};
pub use store::{SessionHandle, SessionStore, SessionStoreBuilder};

// Re-exports
pub use tokio_util::sync::CancellationToken;
