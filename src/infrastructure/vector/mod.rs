//! Vector store adapters
//!
//! - `PgVectorStore`: pgvector table with an approximate HNSW index
//! - `MemoryVectorStore`: exact in-process scan

pub mod memory_store;
pub mod pg_store;
pub mod similarity;

pub use memory_store::MemoryVectorStore;
pub use pg_store::{PgVectorStore, TableName};
pub use similarity::cosine_similarity;
