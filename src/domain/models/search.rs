//! Search request/result models
//!
//! Queries are ephemeral and never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::ScoredChunk;

/// A semantic search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw query text
    pub query: String,

    /// Requested result count; `None` uses the configured default
    pub k: Option<usize>,

    /// Results scoring below this similarity are dropped
    pub min_score: Option<f32>,
}

impl SearchRequest {
    /// Create a request with default `k` and threshold
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: None,
            min_score: None,
        }
    }

    /// Set the requested result count
    #[must_use]
    pub const fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Set the similarity threshold
    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Chunk identifier
    pub id: Uuid,
    /// Chunk text
    pub text: String,
    /// Provenance description
    pub reference_description: Option<String>,
    /// Provenance link
    pub reference_link: Option<String>,
    /// Cosine similarity, higher is more similar
    pub score: f32,
}

impl From<ScoredChunk> for SearchResult {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            id: scored.chunk.id,
            text: scored.chunk.text,
            reference_description: scored.chunk.reference_description,
            reference_link: scored.chunk.reference_link,
            score: scored.score,
        }
    }
}

/// Search response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Echo of the query text
    pub query: String,
    /// Ranked hits, best first
    pub results: Vec<SearchResult>,
}
