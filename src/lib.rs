//! Knowledge Bae - semantic search over a document corpus
//!
//! Text queries are embedded through a remote (or local) embedding provider,
//! compared against chunk embeddings stored in `PostgreSQL` with pgvector, and
//! answered with the nearest chunks by cosine similarity. Outbound embedding
//! calls are guarded by a bulkhead, retry with exponential backoff and a
//! circuit breaker.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, error taxonomy and the
//!   `EmbeddingProvider` / `VectorStore` ports
//! - **Service Layer** (`services`): resilience policies, chunking, retrieval
//!   and ingestion
//! - **Infrastructure Layer** (`infrastructure`): provider and store adapters,
//!   configuration, logging, the HTTP server and the MCP tool server
//! - **Application Layer** (`application`): component wiring
//! - **CLI Layer** (`cli`): the `kbae` command
//!
//! # Example
//!
//! ```ignore
//! use knowledge_bae::application::AppContext;
//! use knowledge_bae::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let context = AppContext::build(ConfigLoader::load()?, false).await?;
//!     for hit in context.retrieval.search_text("sky color").await? {
//!         println!("{:.3} {}", hit.score, hit.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::AppContext;
pub use domain::errors::{
    EmbeddingError, IngestionError, ResilienceError, RetrievalError, StoreError,
};
pub use domain::models::{
    Chunk, Config, IngestionReport, NewChunk, ScoredChunk, SearchRequest, SearchResult,
};
pub use domain::ports::{EmbeddingProvider, VectorStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{IngestionService, ResilientEmbedder, RetrievalService};
