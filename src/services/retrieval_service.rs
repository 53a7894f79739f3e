//! Semantic search over the vector store.
//!
//! `search` embeds the query through the resilience wrapper, asks the store
//! for the nearest chunks and shapes them into ranked results. It never
//! mutates stored state.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::errors::{RetrievalError, RetrievalResult};
use crate::domain::models::{SearchConfig, SearchRequest, SearchResult};
use crate::domain::ports::VectorStore;
use crate::services::resilient_embedder::ResilientEmbedder;

/// Retrieval engine
pub struct RetrievalService {
    embedder: Arc<ResilientEmbedder>,
    store: Arc<dyn VectorStore>,
    default_k: usize,
    max_k: usize,
    min_score: Option<f32>,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<ResilientEmbedder>,
        store: Arc<dyn VectorStore>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            default_k: config.default_k.max(1),
            max_k: config.max_k.max(1),
            min_score: config.min_score,
        }
    }

    /// Search with the configured default `k`
    pub async fn search_text(&self, query: &str) -> RetrievalResult<Vec<SearchResult>> {
        self.search(SearchRequest::new(query)).await
    }

    /// Return up to `k` chunks ranked by descending similarity to the query
    ///
    /// # Errors
    /// - `InvalidQuery` for blank queries or `k == 0`
    /// - `Unavailable` when the embedding circuit is open or retries ran out
    /// - `EmbeddingRejected` when the provider refused the request
    /// - `Store` when the nearest-neighbour query failed
    #[instrument(skip(self, request), fields(k = tracing::field::Empty))]
    pub async fn search(&self, request: SearchRequest) -> RetrievalResult<Vec<SearchResult>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let k = self.resolve_k(request.k)?;
        tracing::Span::current().record("k", k);
        let threshold = request.min_score.or(self.min_score);

        let vector = self.embedder.embed(query).await?;
        let hits = self.store.nearest(&vector, k, threshold).await?;

        info!(results = hits.len(), "Search complete");

        Ok(hits.into_iter().map(SearchResult::from).collect())
    }

    fn resolve_k(&self, requested: Option<usize>) -> RetrievalResult<usize> {
        match requested {
            None => Ok(self.default_k.min(self.max_k)),
            Some(0) => Err(RetrievalError::InvalidQuery(
                "k must be at least 1".to_string(),
            )),
            Some(k) => Ok(k.min(self.max_k)),
        }
    }

    pub const fn default_k(&self) -> usize {
        self.default_k
    }

    pub const fn max_k(&self) -> usize {
        self.max_k
    }
}
