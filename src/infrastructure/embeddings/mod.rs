//! Embedding provider adapters

pub mod local;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;

use crate::domain::models::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::ports::EmbeddingProvider;

pub use local::LocalEmbeddingProvider;
pub use openai::{ApiFlavor, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};

/// Build the configured provider.
pub fn create_provider(
    config: &EmbeddingConfig,
    dimension: usize,
) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.provider {
        EmbeddingProviderKind::Local => Arc::new(LocalEmbeddingProvider::new(dimension)),
        EmbeddingProviderKind::OpenAi | EmbeddingProviderKind::Azure => Arc::new(
            OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::from_settings(config, dimension))?,
        ),
    })
}
