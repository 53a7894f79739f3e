//! Service layer: resilience policies, chunking, retrieval and ingestion

pub mod bulkhead;
pub mod chunker;
pub mod circuit_breaker;
pub mod ingestion_service;
pub mod rate_limiter;
pub mod resilient_embedder;
pub mod retrieval_service;
pub mod retry;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use chunker::Chunker;
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStats};
pub use ingestion_service::{Document, IngestionService};
pub use rate_limiter::OutboundRateLimiter;
pub use resilient_embedder::ResilientEmbedder;
pub use retrieval_service::RetrievalService;
pub use retry::RetryPolicy;
