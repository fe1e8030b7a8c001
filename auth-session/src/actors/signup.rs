//! The sign-up coordinator: serial request handling under a tiered rate limit.
//!
//! Requests are consumed one at a time. Every request bumps a counter before
//! its payload is even looked at; reaching the soft limit pauses the
//! coordinator for a cooldown, reaching the hard limit stops it for good.
//!
//! ```text
//!            tries+1 == soft             tries+1 == hard
//!   Idle ─────────────────────▶ Throttled ───────────────▶ Terminated
//!    ▲  ◀─────────────────────     │                          │
//!    │      any other request      │                          └─ drops every request
//!    └─ any other request ─────────┘
//! ```

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{
    bus::{EventBus, EventFeed},
    config::SignupToml,
    errors::{RateLimitError, Result},
    event::{Credentials, SessionEvent},
    provider::AuthProvider,
    session_log,
    state::SessionState,
};

/// Where the coordinator stands in its rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpPhase {
    /// Serving requests normally.
    Idle,
    /// The soft limit was hit; the coordinator cooled down (or is cooling down).
    Throttled,
    /// The hard limit was hit; every further request is dropped.
    Terminated,
}

/// Tries-based limiter deciding the fate of each request.
///
/// Pure state machine, no timers: the caller performs the cooldown.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    soft_limit: NonZeroU32,
    hard_limit: NonZeroU32,
    cooldown: Duration,
    tries: u32,
    phase: SignUpPhase,
}

impl RateLimiter {
    /// Create a limiter in the `Idle` phase with a zero counter.
    #[must_use]
    pub const fn new(soft_limit: NonZeroU32, hard_limit: NonZeroU32, cooldown: Duration) -> Self {
        Self {
            soft_limit,
            hard_limit,
            cooldown,
            tries: 0,
            phase: SignUpPhase::Idle,
        }
    }

    /// Create a limiter from the `[signup]` config section.
    #[must_use]
    pub const fn from_config(config: &SignupToml) -> Self {
        Self::new(config.soft_limit, config.hard_limit, config.cooldown())
    }

    /// Count one request and decide whether it may reach the provider.
    ///
    /// # Errors
    /// - [`RateLimitError::Soft`] when this request hits the soft limit.
    /// - [`RateLimitError::Hard`] when this request hits the hard limit.
    /// - [`RateLimitError::Terminated`] for every request after the hard limit.
    pub fn admit(&mut self) -> std::result::Result<(), RateLimitError> {
        if self.phase == SignUpPhase::Terminated {
            return Err(RateLimitError::Terminated);
        }

        self.tries += 1;

        if self.tries == self.soft_limit.get() {
            self.phase = SignUpPhase::Throttled;
            return Err(RateLimitError::Soft {
                tries: self.tries,
                cooldown: self.cooldown,
            });
        }
        if self.tries == self.hard_limit.get() {
            self.phase = SignUpPhase::Terminated;
            return Err(RateLimitError::Hard { tries: self.tries });
        }

        self.phase = SignUpPhase::Idle;
        Ok(())
    }

    /// Start counting from zero again. Has no effect once terminated.
    pub fn reset(&mut self) {
        if self.phase != SignUpPhase::Terminated {
            self.tries = 0;
        }
    }

    /// Requests counted since the last reset.
    #[must_use]
    pub const fn tries(&self) -> u32 {
        self.tries
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> SignUpPhase {
        self.phase
    }
}

/// Long-lived actor serving `SignUpRequested` events one at a time.
pub(crate) struct SignUpCoordinator {
    provider: Arc<dyn AuthProvider>,
    bus: EventBus,
    state: watch::Receiver<Arc<SessionState>>,
    limiter: RateLimiter,
    reset_after_cooldown: bool,
}

impl SignUpCoordinator {
    pub(crate) fn new(
        provider: Arc<dyn AuthProvider>,
        bus: EventBus,
        state: watch::Receiver<Arc<SessionState>>,
        config: &SignupToml,
    ) -> Self {
        Self {
            provider,
            bus,
            state,
            limiter: RateLimiter::from_config(config),
            reset_after_cooldown: config.reset_after_cooldown,
        }
    }

    /// Consume requests until the store shuts down.
    ///
    /// Requests that arrive during an attempt or a cooldown stay buffered in
    /// `requests` and are served afterwards, in order.
    pub(crate) async fn run(mut self, requests: EventFeed) {
        while let Some(event) = requests.recv().await {
            if self.handle(event).await.is_err() {
                break;
            }
        }
        session_log!(debug, "Sign-up coordinator stopped");
    }

    async fn handle(&mut self, event: SessionEvent) -> Result<()> {
        match self.limiter.admit() {
            Ok(()) => {
                let SessionEvent::SignUpRequested(credentials) = event else {
                    return Ok(());
                };
                self.attempt(credentials).await
            }
            Err(RateLimitError::Soft { tries, cooldown }) => {
                session_log!(
                    warn,
                    "Sign-up soft limit reached after {} tries, cooling down for {:?}",
                    tries,
                    cooldown
                );
                self.bus.put(SessionEvent::SignUpLimitTimeout).await?;
                tokio::time::sleep(cooldown).await;
                if self.reset_after_cooldown {
                    self.limiter.reset();
                }
                Ok(())
            }
            Err(RateLimitError::Hard { tries }) => {
                session_log!(
                    error,
                    "Sign-up hard limit reached after {} tries, no further sign-ups are served",
                    tries
                );
                self.bus.put(SessionEvent::SignUpLimitError).await
            }
            Err(RateLimitError::Terminated) => {
                session_log!(debug, "Dropping sign-up request, coordinator is terminated");
                Ok(())
            }
        }
    }

    async fn attempt(&self, credentials: Credentials) -> Result<()> {
        let loading = self.state.borrow().loading;

        self.bus.put(SessionEvent::SignUpStarted).await?;

        if loading {
            // Another attempt (or the initial auth check) is still pending.
            session_log!(warn, "Sign-up requested while loading, skipping provider call");
            return Ok(());
        }

        session_log!(
            info,
            "Signing up {} (attempt {})",
            credentials.email,
            self.limiter.tries()
        );
        let outcome = self
            .provider
            .sign_up(&credentials.email, &credentials.password)
            .await;

        let event = match outcome {
            Ok(user) => {
                session_log!(info, "Sign-up of {} succeeded as {}", credentials.email, user.uid);
                SessionEvent::SignUpSucceeded { user }
            }
            Err(e) => {
                session_log!(
                    warn,
                    "Sign-up of {} failed (retryable: {}): {}",
                    credentials.email,
                    e.is_retryable(),
                    e
                );
                SessionEvent::SignUpFailed {
                    message: e.message().to_owned(),
                }
            }
        };
        self.bus.put(event).await
    }
}
