//! Outbound rate limiting for embedding calls

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tracing::trace;

use crate::domain::models::RateLimitConfig;

/// Process-wide token bucket shared by every embedding attempt
pub struct OutboundRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests_per_second: u32,
}

impl OutboundRateLimiter {
    /// Create a limiter; zero values are raised to one
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            limiter: RateLimiter::direct(quota),
            requests_per_second: rps.get(),
        }
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        if self.limiter.check().is_err() {
            trace!(rps = self.requests_per_second, "Rate limiting embedding call");
            self.limiter.until_ready().await;
        }
    }
}

impl From<&RateLimitConfig> for OutboundRateLimiter {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }
}

impl std::fmt::Debug for OutboundRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish_non_exhaustive()
    }
}
