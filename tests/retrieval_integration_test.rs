mod common;

use std::sync::Arc;

use knowledge_bae::domain::errors::{EmbeddingError, RetrievalError};
use knowledge_bae::domain::models::{ChunkingConfig, NewChunk, SearchConfig, SearchRequest};
use knowledge_bae::domain::ports::{EmbeddingProvider, VectorStore};
use knowledge_bae::infrastructure::vector::MemoryVectorStore;
use knowledge_bae::services::{Chunker, Document, IngestionService, RetrievalService};

use common::{resilient, KeywordEmbedder, ScriptedEmbedder, KEYWORD_DIMS};

struct Fixture {
    store: Arc<MemoryVectorStore>,
    ingestion: IngestionService,
    retrieval: RetrievalService,
}

fn fixture(provider: Arc<dyn EmbeddingProvider>, max_chars: usize) -> Fixture {
    let store = Arc::new(MemoryVectorStore::new(KEYWORD_DIMS));
    let embedder = resilient(provider, 4, 2, 3);
    let chunker = Chunker::with_config(ChunkingConfig::with_max_chars(max_chars))
        .expect("valid chunking config");

    let ingestion = IngestionService::new(
        chunker,
        Arc::clone(&embedder),
        Arc::clone(&store) as Arc<dyn VectorStore>,
        4,
    );
    let retrieval = RetrievalService::new(
        embedder,
        Arc::clone(&store) as Arc<dyn VectorStore>,
        &SearchConfig {
            vector_dimensions: KEYWORD_DIMS,
            ..SearchConfig::default()
        },
    );

    Fixture {
        store,
        ingestion,
        retrieval,
    }
}

#[tokio::test]
async fn test_sky_document_splits_and_ranks() {
    common::setup_test_logging();
    let f = fixture(Arc::new(KeywordEmbedder), 20);

    let report = f
        .ingestion
        .ingest(Document::new("The sky is blue. Water is wet.").with_description("Facts"))
        .await
        .expect("ingest should succeed");

    assert_eq!(report.total_chunks, 2);
    assert_eq!(report.chunk_ids.len(), 2);
    assert!(report.is_complete());

    let first = f.store.get(report.chunk_ids[0]).await.unwrap().unwrap();
    let second = f.store.get(report.chunk_ids[1]).await.unwrap().unwrap();
    assert_eq!(first.text, "The sky is blue.");
    assert_eq!(second.text, "Water is wet.");
    assert_eq!(first.reference_description.as_deref(), Some("Facts"));
    assert_eq!(second.reference_description.as_deref(), Some("Facts"));
    assert_ne!(first.embedding, second.embedding);

    let results = f.retrieval.search_text("sky color").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "The sky is blue.");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn test_results_are_ordered_and_bounded_by_k() {
    let f = fixture(Arc::new(KeywordEmbedder), 200);
    let docs = [
        "The sky is blue.",
        "Blue sky over blue water.",
        "Water is wet.",
        "Fire is hot.",
        "Hot fire near wet water.",
        "A blue fire.",
    ];
    for doc in docs {
        f.ingestion.ingest(Document::new(doc)).await.unwrap();
    }

    for k in 1..=8 {
        let results = f
            .retrieval
            .search(SearchRequest::new("blue water").with_k(k))
            .await
            .unwrap();
        assert!(results.len() <= k);
        assert_eq!(results.len(), k.min(docs.len()));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[tokio::test]
async fn test_empty_store_returns_empty_results() {
    let f = fixture(Arc::new(KeywordEmbedder), 200);
    let results = f.retrieval.search_text("anything at all").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_inserted_vector_scores_near_one_against_itself() {
    let f = fixture(Arc::new(KeywordEmbedder), 200);
    let v = KeywordEmbedder::vector("hot fire");
    let id = f.store.insert(NewChunk::new("hot fire", v.clone())).await.unwrap();

    let hits = f.store.nearest(&v, 1, None).await.unwrap();
    assert_eq!(hits[0].chunk.id, id);
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_min_score_filters_weak_matches() {
    let f = fixture(Arc::new(KeywordEmbedder), 200);
    f.ingestion.ingest(Document::new("The sky is blue.")).await.unwrap();
    f.ingestion.ingest(Document::new("Fire is hot.")).await.unwrap();

    let results = f
        .retrieval
        .search(SearchRequest::new("sky").with_min_score(0.9))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "The sky is blue.");
}

#[tokio::test]
async fn test_invalid_queries() {
    let f = fixture(Arc::new(KeywordEmbedder), 200);

    assert!(matches!(
        f.retrieval.search_text("   ").await,
        Err(RetrievalError::InvalidQuery(_))
    ));
    assert!(matches!(
        f.retrieval.search(SearchRequest::new("sky").with_k(0)).await,
        Err(RetrievalError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_provider_outage_surfaces_as_unavailable() {
    let provider = ScriptedEmbedder::new(vec![
        EmbeddingError::ProviderUnavailable("down".to_string()),
        EmbeddingError::ProviderUnavailable("down".to_string()),
        EmbeddingError::ProviderUnavailable("down".to_string()),
    ]);
    let f = fixture(provider.clone(), 200);

    let err = f.retrieval.search_text("sky").await.unwrap_err();
    assert!(matches!(err, RetrievalError::Unavailable { .. }));
    // One attempt plus two retries
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_partial_ingestion_keeps_successful_chunks() {
    let provider = ScriptedEmbedder::new(vec![]);
    let f = fixture(provider, 20);

    let report = f
        .ingestion
        .ingest(Document::new("The sky is blue.\n\nA poison pill.\n\nWater is wet."))
        .await
        .unwrap();

    assert_eq!(report.total_chunks, 3);
    assert_eq!(report.chunk_ids.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(report.is_partial());
    assert_eq!(f.store.count().await.unwrap(), 2);
}
