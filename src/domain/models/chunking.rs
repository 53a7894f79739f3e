//! Text chunking domain models
//!
//! Documents are split into chunks no longer than `max_chars` characters
//! before embedding. Paragraph boundaries are preferred, then sentence
//! boundaries, then whitespace.

use serde::{Deserialize, Serialize};

use super::chunk::MAX_TEXT_CHARS;

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Characters of the previous chunk repeated at the start of the next
    /// (word-aligned, 0 disables overlap)
    #[serde(default)]
    pub overlap_chars: usize,
}

const fn default_max_chars() -> usize {
    2000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: 0,
        }
    }
}

impl ChunkingConfig {
    /// Create a configuration with no overlap
    pub const fn with_max_chars(max_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars: 0,
        }
    }

    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chars == 0 {
            return Err("max_chars must be greater than 0".to_string());
        }

        if self.max_chars > MAX_TEXT_CHARS {
            return Err(format!("max_chars must be at most {MAX_TEXT_CHARS}"));
        }

        if self.overlap_chars >= self.max_chars {
            return Err("overlap_chars must be less than max_chars".to_string());
        }

        Ok(())
    }
}
