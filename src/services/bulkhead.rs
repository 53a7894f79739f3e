//! Bulkhead limiting concurrent outbound embedding calls.
//!
//! Callers beyond the limit queue on a FIFO semaphore instead of failing.
//! An optional queue timeout bounds how long a caller waits for a slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::domain::errors::{EmbeddingError, ResilienceError};

/// Process-wide concurrency gate.
#[derive(Debug)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    queue_timeout: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
}

impl Bulkhead {
    /// Create a bulkhead admitting at most `max_concurrency` callers at once.
    pub fn new(max_concurrency: usize, queue_timeout: Option<Duration>) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            queue_timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a slot.
    ///
    /// The slot is released when the returned permit drops, including when the
    /// owning future is cancelled.
    pub async fn acquire(&self) -> Result<BulkheadPermit, ResilienceError> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        let permit = match self.queue_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| ResilienceError::BulkheadTimeout(limit))?,
            None => acquire.await,
        }
        .map_err(|_| {
            ResilienceError::Rejected(EmbeddingError::ProviderUnavailable(
                "embedding bulkhead closed".to_string(),
            ))
        })?;

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(BulkheadPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

/// A held bulkhead slot.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_released_on_drop() {
        let bulkhead = Bulkhead::new(2, None);
        let first = bulkhead.acquire().await.unwrap();
        let second = bulkhead.acquire().await.unwrap();
        assert_eq!(bulkhead.in_flight(), 2);
        assert_eq!(bulkhead.available(), 0);

        drop(first);
        assert_eq!(bulkhead.in_flight(), 1);
        drop(second);
        assert_eq!(bulkhead.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout() {
        let bulkhead = Bulkhead::new(1, Some(Duration::from_millis(50)));
        let _held = bulkhead.acquire().await.unwrap();

        let result = bulkhead.acquire().await;
        assert!(matches!(
            result,
            Err(ResilienceError::BulkheadTimeout(d)) if d == Duration::from_millis(50)
        ));
        assert_eq!(bulkhead.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_queued_caller_proceeds_when_slot_frees() {
        let bulkhead = Arc::new(Bulkhead::new(1, None));
        let held = bulkhead.acquire().await.unwrap();

        let waiter = {
            let bulkhead = Arc::clone(&bulkhead);
            tokio::spawn(async move { bulkhead.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak() {
        let bulkhead = Arc::new(Bulkhead::new(1, None));
        let held = bulkhead.acquire().await.unwrap();

        let waiter = {
            let bulkhead = Arc::clone(&bulkhead);
            tokio::spawn(async move {
                let _permit = bulkhead.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert_eq!(bulkhead.available(), 1);
        assert_eq!(bulkhead.in_flight(), 0);
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        assert_eq!(Bulkhead::new(0, None).max_concurrency(), 1);
    }
}
