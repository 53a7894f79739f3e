//! Circuit breaker guarding the embedding provider.
//!
//! Tracks consecutive failed calls and stops contacting the provider once a
//! threshold is reached. After the cool-down, exactly one trial call is let
//! through (half-open): success closes the circuit, failure reopens it and
//! restarts the cool-down.
//!
//! All transitions happen under a single lock, so two callers can never both
//! be granted the half-open trial.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::errors::ResilienceError;
use crate::domain::models::CircuitBreakerSettings;

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Duration to keep the circuit open before trying half-open.
    pub cool_down: Duration,
    /// Whether the breaker may open at all.
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold.max(1),
            cool_down: Duration::from_millis(settings.cool_down_ms),
            enabled: settings.enabled,
        }
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally.
    Closed,
    /// Circuit is open, requests are blocked.
    Open,
    /// Circuit is testing if the provider has recovered.
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStats {
    /// Current state.
    pub state: CircuitState,
    /// Failed calls since the last success.
    pub consecutive_failures: u32,
    /// Total times the circuit opened.
    pub open_count: u32,
    /// Whether the breaker is enabled.
    pub enabled: bool,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    open_count: u32,
}

impl BreakerState {
    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_in_flight = false;
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.trial_in_flight = false;
        self.consecutive_failures = 0;
    }
}

/// Process-wide circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new, closed circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
                open_count: 0,
            }),
        }
    }

    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State stays consistent across a panic: every transition is a few
        // field writes with no early return.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask permission to make a call.
    ///
    /// Fails with [`ResilienceError::CircuitOpen`] while the circuit is open or
    /// while another caller holds the half-open trial.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, ResilienceError> {
        if !self.config.enabled {
            return Ok(CallPermit::new(Arc::clone(self), false));
        }

        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(Arc::clone(self), false)),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(self.config.cool_down, |at| at.elapsed());
                if elapsed >= self.config.cool_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    info!("Embedding circuit half-open, allowing one trial call");
                    Ok(CallPermit::new(Arc::clone(self), true))
                } else {
                    Err(ResilienceError::CircuitOpen {
                        retry_after: self.config.cool_down - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(ResilienceError::CircuitOpen {
                        retry_after: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(CallPermit::new(Arc::clone(self), true))
                }
            }
        }
    }

    /// Remaining cool-down if some other caller has tripped the circuit.
    pub fn open_retry_after(&self) -> Option<Duration> {
        if !self.config.enabled {
            return None;
        }
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => None,
            CircuitState::HalfOpen => Some(Duration::ZERO),
            CircuitState::Open => Some(
                inner
                    .opened_at
                    .map_or(Duration::ZERO, |at| self.config.cool_down.saturating_sub(at.elapsed())),
            ),
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns true if calls are currently being short-circuited.
    pub fn is_open(&self) -> bool {
        self.config.enabled && self.state() != CircuitState::Closed
    }

    /// Snapshot for health reporting.
    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        CircuitStats {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            open_count: inner.open_count,
            enabled: self.config.enabled,
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.close();
            info!("Embedding circuit closed after successful trial call");
        } else if inner.state == CircuitState::Closed {
            inner.consecutive_failures = 0;
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.open();
            warn!(
                cool_down_ms = self.config.cool_down.as_millis() as u64,
                "Embedding circuit trial call failed, reopening"
            );
            return;
        }
        if inner.state != CircuitState::Closed {
            // Outcome of a call admitted before the circuit opened.
            return;
        }
        inner.consecutive_failures += 1;
        if self.config.enabled && inner.consecutive_failures >= self.config.failure_threshold {
            inner.open();
            warn!(
                consecutive_failures = inner.consecutive_failures,
                cool_down_ms = self.config.cool_down.as_millis() as u64,
                "Embedding circuit opened"
            );
        }
    }

    fn on_abandon(&self, trial: bool) {
        if trial {
            let mut inner = self.lock();
            if inner.state == CircuitState::HalfOpen {
                inner.trial_in_flight = false;
            }
        }
    }
}

/// Permission to make one logical call.
///
/// Report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). Dropping the permit without an
/// outcome (for instance on cancellation) releases a half-open trial slot
/// without changing the breaker state.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    settled: bool,
}

impl CallPermit {
    const fn new(breaker: Arc<CircuitBreaker>, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// Whether this is the half-open trial call.
    pub const fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandon(self.trial);
        }
    }
}
