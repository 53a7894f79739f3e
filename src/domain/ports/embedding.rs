//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for semantic similarity search.
//!
//! Providers make exactly one attempt per call. Retries, backoff and
//! circuit breaking belong to the resilience wrapper, which relies on the
//! typed [`EmbeddingError`] to tell transient failures from permanent ones.

use async_trait::async_trait;

use crate::domain::errors::EmbeddingError;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "azure", "local").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single non-empty text.
    ///
    /// The returned vector always has exactly [`dimension`](Self::dimension)
    /// elements; a provider answering with any other length reports
    /// [`EmbeddingError::DimensionMismatch`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
