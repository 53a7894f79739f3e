//! Chunk domain models
//!
//! A chunk is the unit of retrievable content: a bounded slice of source text
//! plus its provenance metadata and embedding vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::StoreError;

/// Column limit for chunk text, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Column limit for the reference description, in characters.
pub const MAX_REFERENCE_DESCRIPTION_CHARS: usize = 500;

/// Column limit for the reference link, in characters.
pub const MAX_REFERENCE_LINK_CHARS: usize = 2_000;

/// A persisted chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Unique identifier, assigned by the store at insert time
    pub id: Uuid,

    /// Textual content
    pub text: String,

    /// Human-readable provenance (document title, section, ...)
    pub reference_description: Option<String>,

    /// Provenance link (URL or path)
    pub reference_link: Option<String>,

    /// Embedding vector; `None` until computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Set once at insert
    pub created_at: DateTime<Utc>,

    /// Set on every mutation
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    /// Returns true if this chunk can be found by similarity search
    pub const fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }
}

/// A chunk ready to be inserted: text, metadata and a computed embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    /// Textual content
    pub text: String,
    /// Human-readable provenance
    pub reference_description: Option<String>,
    /// Provenance link
    pub reference_link: Option<String>,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl NewChunk {
    /// Create a chunk without provenance metadata.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            reference_description: None,
            reference_link: None,
            embedding,
        }
    }

    /// Attach provenance metadata.
    pub fn with_reference(
        mut self,
        description: Option<String>,
        link: Option<String>,
    ) -> Self {
        self.reference_description = description;
        self.reference_link = link;
        self
    }

    /// Check the chunk against the schema limits and the store dimension.
    pub fn validate(&self, dimensions: usize) -> Result<(), StoreError> {
        if self.embedding.len() != dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: dimensions,
                actual: self.embedding.len(),
            });
        }
        if self.text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }
        check_length("text", &self.text, MAX_TEXT_CHARS)?;
        if let Some(description) = &self.reference_description {
            check_length(
                "reference_description",
                description,
                MAX_REFERENCE_DESCRIPTION_CHARS,
            )?;
        }
        if let Some(link) = &self.reference_link {
            check_length("reference_link", link, MAX_REFERENCE_LINK_CHARS)?;
        }
        Ok(())
    }
}

/// Check a field against its character limit.
pub fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), StoreError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(StoreError::FieldTooLong { field, max, actual });
    }
    Ok(())
}

/// A chunk returned from a nearest-neighbour query with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The matched chunk (embedding omitted)
    pub chunk: Chunk,
    /// Cosine similarity to the query vector, in [-1, 1]
    pub score: f32,
}
