//! Domain errors for the Knowledge Bae retrieval core.
//!
//! Each layer owns one error type and each failure kind maps to exactly one
//! caller-visible outcome:
//!
//! - [`EmbeddingError`]: what an embedding provider can report for one call
//! - [`ResilienceError`]: what the resilience wrapper reports after bulkhead,
//!   retry and circuit-breaker policies have been applied
//! - [`StoreError`]: vector store failures
//! - [`RetrievalError`]: what `search` surfaces to its caller
//! - [`IngestionError`]: whole-request ingestion failures (per-chunk failures
//!   are data in the ingestion report, not errors)

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by an embedding provider for a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// Text is empty or exceeds provider limits (never retried).
    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),

    /// Provider signalled throttling (HTTP 429).
    #[error("Embedding provider rate limited the request")]
    RateLimited {
        /// Delay hint from a `Retry-After` header, if present.
        retry_after: Option<Duration>,
    },

    /// Network or provider-side failure that may clear on its own.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A single attempt exceeded its time budget.
    #[error("Embedding request timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials were refused (HTTP 401/403).
    #[error("Embedding provider refused credentials: {0}")]
    Unauthorized(String),

    /// Any other non-success status that retrying cannot fix.
    #[error("Embedding provider rejected the request ({status}): {body}")]
    Rejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The provider answered with a body that could not be decoded.
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    /// The provider returned a vector of the wrong length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },
}

impl EmbeddingError {
    /// Returns true if this error is transient and the call may be retried.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ProviderUnavailable(_) | Self::Timeout(_)
        )
    }

    /// Delay hint carried by a rate-limit response.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Outcome of a call made through the resilience wrapper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResilienceError {
    /// The circuit breaker is open; the provider was not contacted.
    #[error("Embedding circuit is open, retry after {retry_after:?}")]
    CircuitOpen {
        /// Remaining cool-down (zero while a half-open trial is in flight).
        retry_after: Duration,
    },

    /// Every permitted attempt failed with a transient error.
    #[error("Embedding failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: EmbeddingError,
    },

    /// Waiting for a bulkhead slot took longer than the queue timeout.
    #[error("Timed out after {0:?} waiting for an embedding slot")]
    BulkheadTimeout(Duration),

    /// The provider returned a non-transient failure.
    #[error(transparent)]
    Rejected(EmbeddingError),
}

impl ResilienceError {
    /// Returns true if the provider is judged unavailable (caller may retry later).
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen { .. } | Self::RetriesExhausted { .. } | Self::BulkheadTimeout(_)
        )
    }
}

/// Vector store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding length does not match the configured dimension.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension supplied.
        actual: usize,
    },

    /// Chunks carrying an embedding must have text.
    #[error("Chunk text cannot be empty")]
    EmptyText,

    /// A field exceeds its column limit.
    #[error("Field '{field}' is {actual} characters, limit is {max}")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Column limit in characters.
        max: usize,
        /// Actual length in characters.
        actual: usize,
    },

    /// `k` must be at least 1.
    #[error("Result count k must be at least 1")]
    InvalidK,

    /// The backing schema does not match the configuration.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Caller-visible search failures.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Empty query, bad `k`, or text the provider refused as input.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding provider judged unavailable; retry later.
    #[error("Retrieval unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: String,
        /// Suggested delay before retrying, when known.
        retry_after: Option<Duration>,
    },

    /// Embedding provider rejected the request for a non-input reason
    /// (credentials, configuration, malformed response).
    #[error("Embedding provider rejected the query: {0}")]
    EmbeddingRejected(EmbeddingError),

    /// Vector store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ResilienceError> for RetrievalError {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::CircuitOpen { retry_after } => Self::Unavailable {
                reason: err.to_string(),
                retry_after: Some(retry_after),
            },
            ResilienceError::RetriesExhausted { ref last_error, .. } => Self::Unavailable {
                retry_after: last_error.retry_after(),
                reason: err.to_string(),
            },
            ResilienceError::BulkheadTimeout(_) => Self::Unavailable {
                reason: err.to_string(),
                retry_after: None,
            },
            ResilienceError::Rejected(EmbeddingError::InvalidInput(msg)) => Self::InvalidQuery(msg),
            ResilienceError::Rejected(inner) => Self::EmbeddingRejected(inner),
        }
    }
}

/// Whole-request ingestion failures.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Document text or metadata is unusable.
    #[error("Invalid ingestion input: {0}")]
    InvalidInput(String),
}

/// Result alias for search operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(EmbeddingError::RateLimited { retry_after: None }.is_transient());
        assert!(EmbeddingError::ProviderUnavailable("503".to_string()).is_transient());
        assert!(EmbeddingError::Timeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!EmbeddingError::InvalidInput("empty".to_string()).is_transient());
        assert!(!EmbeddingError::Unauthorized("bad key".to_string()).is_transient());
        assert!(!EmbeddingError::MalformedResponse("eof".to_string()).is_transient());
        assert!(!EmbeddingError::DimensionMismatch { expected: 3, actual: 2 }.is_transient());
        assert!(!EmbeddingError::Rejected { status: 404, body: String::new() }.is_transient());
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let hint = Some(Duration::from_secs(2));
        assert_eq!(EmbeddingError::RateLimited { retry_after: hint }.retry_after(), hint);
        assert_eq!(EmbeddingError::Timeout(Duration::from_secs(2)).retry_after(), None);
    }

    #[test]
    fn test_circuit_open_maps_to_unavailable() {
        let err: RetrievalError = ResilienceError::CircuitOpen {
            retry_after: Duration::from_secs(10),
        }
        .into();
        match err {
            RetrievalError::Unavailable { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(10)));
            }
            other => panic!("Expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_retries_map_to_unavailable() {
        let err: RetrievalError = ResilienceError::RetriesExhausted {
            attempts: 4,
            last_error: EmbeddingError::ProviderUnavailable("502".to_string()),
        }
        .into();
        assert!(matches!(err, RetrievalError::Unavailable { .. }));
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_query() {
        let err: RetrievalError =
            ResilienceError::Rejected(EmbeddingError::InvalidInput("too long".to_string())).into();
        assert!(matches!(err, RetrievalError::InvalidQuery(msg) if msg == "too long"));
    }

    #[test]
    fn test_unauthorized_maps_to_rejected() {
        let err: RetrievalError =
            ResilienceError::Rejected(EmbeddingError::Unauthorized("401".to_string())).into();
        assert!(matches!(err, RetrievalError::EmbeddingRejected(_)));
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(ResilienceError::BulkheadTimeout(Duration::from_secs(1)).is_unavailable());
        assert!(!ResilienceError::Rejected(EmbeddingError::InvalidInput(String::new()))
            .is_unavailable());
    }
}
