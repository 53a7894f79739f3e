//! Document ingestion: chunk, embed, insert.
//!
//! Ingestion is append-only. Re-ingesting a document creates new chunks with
//! fresh ids. Chunks that fail to embed or persist are reported in the
//! [`IngestionReport`]; chunks already persisted are never rolled back.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{EmbeddingError, IngestionError, ResilienceError, StoreError};
use crate::domain::models::chunk::{
    check_length, MAX_REFERENCE_DESCRIPTION_CHARS, MAX_REFERENCE_LINK_CHARS,
};
use crate::domain::models::ingestion::preview;
use crate::domain::models::{ChunkFailure, IngestionReport, NewChunk};
use crate::domain::ports::VectorStore;
use crate::services::chunker::Chunker;
use crate::services::resilient_embedder::ResilientEmbedder;

/// A document to ingest.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub text: String,
    pub reference_description: Option<String>,
    pub reference_link: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.reference_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.reference_link = Some(link.into());
        self
    }
}

#[derive(Debug)]
enum ChunkError {
    Embedding(ResilienceError),
    Store(StoreError),
}

impl ChunkError {
    const fn is_dimension_mismatch(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::DimensionMismatch { .. })
                | Self::Embedding(ResilienceError::Rejected(
                    EmbeddingError::DimensionMismatch { .. }
                ))
        )
    }
}

impl std::fmt::Display for ChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedding(err) => write!(f, "embedding failed: {err}"),
            Self::Store(err) => write!(f, "insert failed: {err}"),
        }
    }
}

/// Ingestion pipeline
pub struct IngestionService {
    chunker: Chunker,
    embedder: Arc<ResilientEmbedder>,
    store: Arc<dyn VectorStore>,
    concurrency: usize,
}

impl IngestionService {
    /// Chunks of one document are embedded `concurrency` at a time; the
    /// bulkhead still caps outbound calls process-wide.
    pub fn new(
        chunker: Chunker,
        embedder: Arc<ResilientEmbedder>,
        store: Arc<dyn VectorStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Split, embed and persist a document.
    ///
    /// Returns the ids of persisted chunks in document order alongside the
    /// chunks that failed.
    #[instrument(skip(self, document), fields(chars = document.text.len()))]
    pub async fn ingest(&self, document: Document) -> Result<IngestionReport, IngestionError> {
        Self::validate(&document)?;

        let texts = self.chunker.chunk(&document.text);
        let total_chunks = texts.len();
        info!(chunks = total_chunks, "Document split into chunks");

        let outcomes: Vec<(usize, String, Result<Uuid, ChunkError>)> =
            stream::iter(texts.into_iter().enumerate())
                .map(|(index, text)| {
                    let description = document.reference_description.clone();
                    let link = document.reference_link.clone();
                    async move {
                        let outcome = self.ingest_chunk(&text, description, link).await;
                        (index, text, outcome)
                    }
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut report = IngestionReport {
            total_chunks,
            ..IngestionReport::default()
        };
        for (index, text, outcome) in outcomes {
            match outcome {
                Ok(id) => report.chunk_ids.push(id),
                Err(err) => {
                    if err.is_dimension_mismatch() {
                        error!(index, error = %err, "Embedding dimension mismatch");
                    } else {
                        warn!(index, error = %err, "Chunk ingestion failed");
                    }
                    report.failures.push(ChunkFailure {
                        index,
                        preview: preview(&text),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            persisted = report.chunk_ids.len(),
            failed = report.failures.len(),
            "Ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_chunk(
        &self,
        text: &str,
        description: Option<String>,
        link: Option<String>,
    ) -> Result<Uuid, ChunkError> {
        let embedding = self.embedder.embed(text).await.map_err(ChunkError::Embedding)?;
        let chunk = NewChunk::new(text, embedding).with_reference(description, link);
        self.store.insert(chunk).await.map_err(ChunkError::Store)
    }

    fn validate(document: &Document) -> Result<(), IngestionError> {
        if document.text.trim().is_empty() {
            return Err(IngestionError::InvalidInput(
                "document text must not be empty".to_string(),
            ));
        }
        if let Some(description) = &document.reference_description {
            check_length(
                "reference_description",
                description,
                MAX_REFERENCE_DESCRIPTION_CHARS,
            )
            .map_err(|e| IngestionError::InvalidInput(e.to_string()))?;
        }
        if let Some(link) = &document.reference_link {
            check_length("reference_link", link, MAX_REFERENCE_LINK_CHARS)
                .map_err(|e| IngestionError::InvalidInput(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ChunkingConfig, ResilienceConfig, RetryConfig};
    use crate::domain::ports::EmbeddingProvider;
    use crate::infrastructure::vector::MemoryVectorStore;
    use async_trait::async_trait;

    /// Fails permanently on texts containing "poison".
    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn name(&self) -> &'static str {
            "length"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("poison") {
                return Err(EmbeddingError::InvalidInput("poisoned".to_string()));
            }
            Ok(vec![1.0, text.len() as f32])
        }
    }

    fn service(max_chars: usize, store: Arc<MemoryVectorStore>) -> IngestionService {
        let config = ResilienceConfig {
            retry: RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            },
            ..ResilienceConfig::default()
        };
        IngestionService::new(
            Chunker::with_config(ChunkingConfig::with_max_chars(max_chars)).unwrap(),
            Arc::new(ResilientEmbedder::new(Arc::new(LengthProvider), &config)),
            store,
            4,
        )
    }

    #[tokio::test]
    async fn test_ingest_splits_and_persists() {
        let store = Arc::new(MemoryVectorStore::new(2));
        let service = service(20, Arc::clone(&store));

        let report = service
            .ingest(Document::new("The sky is blue. Water is wet.").with_description("Facts"))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.total_chunks, 2);
        assert_eq!(report.chunk_ids.len(), 2);

        let first = store.get(report.chunk_ids[0]).await.unwrap().unwrap();
        let second = store.get(report.chunk_ids[1]).await.unwrap().unwrap();
        assert_eq!(first.text, "The sky is blue.");
        assert_eq!(second.text, "Water is wet.");
        assert_eq!(first.reference_description.as_deref(), Some("Facts"));
        assert_eq!(second.reference_description.as_deref(), Some("Facts"));
        assert_ne!(first.embedding, second.embedding);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let store = Arc::new(MemoryVectorStore::new(2));
        let service = service(20, Arc::clone(&store));

        let report = service
            .ingest(Document::new("Good chunk here.\n\nA poison chunk.\n\nAnother good one."))
            .await
            .unwrap();

        assert!(report.is_partial());
        assert_eq!(report.chunk_ids.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].preview, "A poison chunk.");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reingestion_appends() {
        let store = Arc::new(MemoryVectorStore::new(2));
        let service = service(100, Arc::clone(&store));

        let first = service.ingest(Document::new("Same text.")).await.unwrap();
        let second = service.ingest(Document::new("Same text.")).await.unwrap();

        assert_ne!(first.chunk_ids, second.chunk_ids);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_reported_per_chunk() {
        let store = Arc::new(MemoryVectorStore::new(3));
        let service = service(100, Arc::clone(&store));

        let report = service.ingest(Document::new("Some text.")).await.unwrap();
        assert!(report.chunk_ids.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_rejects_empty_document() {
        let store = Arc::new(MemoryVectorStore::new(2));
        let result = service(100, store).ingest(Document::new(" \n ")).await;
        assert!(matches!(result, Err(IngestionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rejects_oversize_link() {
        let store = Arc::new(MemoryVectorStore::new(2));
        let document = Document::new("text").with_link("l".repeat(2001));
        let result = service(100, store).ingest(document).await;
        assert!(matches!(result, Err(IngestionError::InvalidInput(_))));
    }
}
