//! Ingestion outcome models
//!
//! Partial ingestion is an accepted outcome: successes and per-chunk
//! failures are reported side by side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFailure {
    /// Position of the chunk within the document (0-based)
    pub index: usize,
    /// First characters of the chunk text
    pub preview: String,
    /// Why it failed
    pub reason: String,
}

/// Per-document ingestion report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    /// Ids of persisted chunks, in document order
    pub chunk_ids: Vec<Uuid>,
    /// Chunks that failed to embed or persist
    pub failures: Vec<ChunkFailure>,
    /// Number of chunks the document was split into
    pub total_chunks: usize,
}

impl IngestionReport {
    /// Every chunk was persisted
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Some but not all chunks were persisted
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && !self.chunk_ids.is_empty()
    }

    /// Fold another report into this one (multi-document ingestion).
    pub fn merge(&mut self, other: Self) {
        self.chunk_ids.extend(other.chunk_ids);
        self.failures.extend(other.failures);
        self.total_chunks += other.total_chunks;
    }
}

/// Shorten chunk text for failure reports.
pub fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 60;
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}
