use std::time::Duration;

use crate::domain::errors::EmbeddingError;
use crate::domain::models::RetryConfig;

/// Retry policy with exponential backoff
///
/// Backoff doubles with each retry from `initial_backoff_ms` and is capped at
/// `max_backoff_ms`: 500ms → 1s → 2s → 4s → 8s (max) with the defaults.
///
/// # Retry Decision
/// - Retry on: rate limiting, provider unavailability, attempt timeouts
/// - Do NOT retry: invalid input, refused credentials, malformed responses,
///   dimension mismatches, any other rejection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Whether a failure on retry number `retry` (0-based) may be retried
    pub const fn should_retry(&self, err: &EmbeddingError, retry: u32) -> bool {
        err.is_transient() && retry < self.max_retries
    }

    /// Calculate backoff duration for a given retry
    ///
    /// Formula: min(initial_backoff * 2^retry, max_backoff)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let multiplier = 2_u64.saturating_pow(retry);
        let backoff_ms = self.initial_backoff_ms.saturating_mul(multiplier);
        Duration::from_millis(backoff_ms.min(self.max_backoff_ms))
    }

    /// Delay before the next attempt, honouring a provider `Retry-After` hint
    ///
    /// The hint can lengthen the delay but never past `max_backoff`.
    pub fn delay_for(&self, retry: u32, err: &EmbeddingError) -> Duration {
        let backoff = self.calculate_backoff(retry);
        let cap = Duration::from_millis(self.max_backoff_ms);
        err.retry_after()
            .map_or(backoff, |hint| backoff.max(hint.min(cap)))
    }
}
