//! Resilient embedding calls.
//!
//! Composes the bulkhead, retry policy and circuit breaker around an
//! [`EmbeddingProvider`]:
//!
//! 1. The circuit breaker is consulted once per logical call. An open circuit
//!    fails immediately without touching the provider.
//! 2. Each attempt waits for a bulkhead slot (and the optional rate limiter),
//!    then runs under its own timeout. The slot is released as soon as the
//!    attempt finishes, so backoff sleeps never hold one.
//! 3. Transient failures are retried with exponential backoff. The final
//!    outcome of the logical call is reported to the breaker.
//!
//! Dropping the returned future cancels the in-flight attempt and releases
//! every slot and permit it holds.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::domain::errors::{EmbeddingError, ResilienceError};
use crate::domain::models::ResilienceConfig;
use crate::domain::ports::EmbeddingProvider;
use crate::services::bulkhead::Bulkhead;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::services::rate_limiter::OutboundRateLimiter;
use crate::services::retry::RetryPolicy;

enum AttemptFailure {
    Gate(ResilienceError),
    Provider(EmbeddingError),
}

/// Embedding client wrapped in bulkhead, retry and circuit breaker policies.
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    bulkhead: Bulkhead,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    rate_limiter: Option<OutboundRateLimiter>,
}

impl ResilientEmbedder {
    /// Build the wrapper from configuration.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &ResilienceConfig) -> Self {
        Self {
            provider,
            bulkhead: Bulkhead::new(config.max_concurrency, config.queue_timeout()),
            breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::from(
                &config.circuit_breaker,
            ))),
            retry: RetryPolicy::from(&config.retry),
            attempt_timeout: config.attempt_timeout(),
            rate_limiter: config.rate_limit.as_ref().map(OutboundRateLimiter::from),
        }
    }

    /// Build the wrapper from already constructed parts.
    pub fn with_parts(
        provider: Arc<dyn EmbeddingProvider>,
        bulkhead: Bulkhead,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            bulkhead,
            breaker,
            retry,
            attempt_timeout,
            rate_limiter: None,
        }
    }

    /// Add an outbound rate limit applied before every attempt.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: OutboundRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub const fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub const fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Embed `text`, applying every resilience policy.
    #[instrument(skip(self, text), fields(provider = self.provider.name(), chars = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ResilienceError> {
        let permit = self.breaker.try_acquire()?;
        let mut retry = 0_u32;

        loop {
            let err = match self.attempt(text).await {
                Ok(vector) => {
                    if retry > 0 {
                        debug!(retries = retry, "Embedding succeeded after retries");
                    }
                    permit.record_success();
                    return Ok(vector);
                }
                Err(AttemptFailure::Gate(err)) => return Err(err),
                Err(AttemptFailure::Provider(err)) => err,
            };

            if !err.is_transient() {
                // A definitive answer proves the provider is reachable.
                debug!(error = %err, "Permanent embedding error, not retrying");
                permit.record_success();
                return Err(ResilienceError::Rejected(err));
            }

            if !self.retry.should_retry(&err, retry) {
                warn!(attempts = retry + 1, error = %err, "Embedding retries exhausted");
                permit.record_failure();
                return Err(ResilienceError::RetriesExhausted {
                    attempts: retry + 1,
                    last_error: err,
                });
            }

            if !permit.is_trial() {
                if let Some(retry_after) = self.breaker.open_retry_after() {
                    debug!("Circuit opened by another caller, abandoning retries");
                    return Err(ResilienceError::CircuitOpen { retry_after });
                }
            }

            let delay = self.retry.delay_for(retry, &err);
            warn!(
                attempt = retry + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Embedding attempt failed with transient error, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn attempt(&self, text: &str) -> Result<Vec<f32>, AttemptFailure> {
        let _slot = self.bulkhead.acquire().await.map_err(AttemptFailure::Gate)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        match tokio::time::timeout(self.attempt_timeout, self.provider.embed(text)).await {
            Ok(result) => result.map_err(AttemptFailure::Provider),
            Err(_) => Err(AttemptFailure::Provider(EmbeddingError::Timeout(
                self.attempt_timeout,
            ))),
        }
    }
}

impl std::fmt::Debug for ResilientEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientEmbedder")
            .field("provider", &self.provider.name())
            .field("bulkhead", &self.bulkhead)
            .field("breaker", &self.breaker.stats())
            .field("retry", &self.retry)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}
