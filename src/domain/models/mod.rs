//! Domain models

pub mod chunk;
pub mod chunking;
pub mod config;
pub mod ingestion;
pub mod search;

pub use chunk::{Chunk, NewChunk, ScoredChunk};
pub use chunking::ChunkingConfig;
pub use config::{
    CircuitBreakerSettings, Config, DatabaseConfig, EmbeddingConfig, EmbeddingProviderKind,
    LoggingConfig, RateLimitConfig, ResilienceConfig, RetryConfig, SearchConfig, ServerConfig,
    StoreBackend, StoreConfig,
};
pub use ingestion::{ChunkFailure, IngestionReport};
pub use search::{SearchRequest, SearchResponse, SearchResult};
