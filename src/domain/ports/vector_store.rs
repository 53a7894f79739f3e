//! Vector store port.
//!
//! Persists chunks with their embeddings and answers nearest-neighbour
//! queries ranked by cosine similarity.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::StoreError;
use crate::domain::models::{Chunk, NewChunk, ScoredChunk};

/// Storage interface consumed by retrieval and ingestion.
///
/// Implementations must let readers proceed while unrelated inserts are in
/// progress. Each insert and each query is independently atomic.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Configured embedding dimension.
    fn dimensions(&self) -> usize;

    /// Persist a chunk and return its server-assigned id.
    ///
    /// Fails with [`StoreError::DimensionMismatch`] when the embedding length
    /// differs from [`dimensions`](Self::dimensions).
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid, StoreError>;

    /// Return up to `k` embedded chunks ranked by descending cosine similarity.
    ///
    /// Results scoring below `threshold` are excluded. Equal scores are
    /// ordered by insertion (earlier `created_at` first).
    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Fetch a chunk by id.
    async fn get(&self, id: Uuid) -> Result<Option<Chunk>, StoreError>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<u64, StoreError>;
}
