mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use knowledge_bae::domain::errors::EmbeddingError;
use knowledge_bae::domain::models::{ChunkingConfig, SearchConfig};
use knowledge_bae::domain::ports::{EmbeddingProvider, VectorStore};
use knowledge_bae::infrastructure::http::{build_router, AppState};
use knowledge_bae::infrastructure::vector::MemoryVectorStore;
use knowledge_bae::services::{Chunker, IngestionService, RetrievalService};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{resilient, KeywordEmbedder, ScriptedEmbedder, KEYWORD_DIMS};

fn app(provider: Arc<dyn EmbeddingProvider>, failure_threshold: u32) -> Router {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new(KEYWORD_DIMS));
    let embedder = resilient(provider, 4, 0, failure_threshold);
    let chunker = Chunker::with_config(ChunkingConfig::with_max_chars(20)).unwrap();

    build_router(AppState {
        retrieval: Arc::new(RetrievalService::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            &SearchConfig {
                vector_dimensions: KEYWORD_DIMS,
                ..SearchConfig::default()
            },
        )),
        ingestion: Arc::new(IngestionService::new(
            chunker,
            Arc::clone(&embedder),
            Arc::clone(&store),
            2,
        )),
        embedder,
        store,
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_greeting() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(body["message"], "Hello World from Knowledge Bae API!");
}

#[tokio::test]
async fn test_ingest_then_search() {
    let app = app(Arc::new(KeywordEmbedder), 3);

    let (status, _, report) = send(
        &app,
        post_json(
            "/ingest",
            &json!({
                "text": "The sky is blue. Water is wet.",
                "referenceDescription": "Facts",
                "referenceLink": "https://example.com/facts"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["totalChunks"], 2);
    assert_eq!(report["chunkIds"].as_array().unwrap().len(), 2);

    let (status, _, body) = send(&app, get("/search?query=sky%20color&k=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "sky color");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "The sky is blue.");
    assert_eq!(results[0]["referenceDescription"], "Facts");
    assert_eq!(results[0]["referenceLink"], "https://example.com/facts");
    assert!(results[0]["score"].as_f64().unwrap() > 0.9);
    assert!(results[0]["id"].is_string());
}

#[tokio::test]
async fn test_search_on_empty_store() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    let (status, _, body) = send(&app, get("/search?query=anything")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_missing_or_empty_query_is_400() {
    let app = app(Arc::new(KeywordEmbedder), 3);

    let (status, _, body) = send(&app, get("/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("query"));

    let (status, _, _) = send(&app, get("/search?query=%20%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_positive_k_is_400() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    for uri in ["/search?query=sky&k=0", "/search?query=sky&k=-2"] {
        let (status, _, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_malformed_parameters_get_json_error() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    for uri in ["/search?query=sky&k=abc", "/search?query=sky&min_score=high"] {
        let (status, headers, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_open_circuit_is_503_with_retry_after() {
    let provider = ScriptedEmbedder::new(vec![EmbeddingError::ProviderUnavailable(
        "down".to_string(),
    )]);
    let app = app(provider, 1);

    let (status, _, _) = send(&app, get("/search?query=sky")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, headers, body) = send(&app, get("/search?query=sky")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("circuit"));
    let retry_after: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 30);

    let (status, _, health) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["circuit"]["state"], "open");
}

#[tokio::test]
async fn test_partial_ingest_is_207() {
    let app = app(ScriptedEmbedder::new(vec![]), 5);
    let (status, _, report) = send(
        &app,
        post_json("/ingest", &json!({ "text": "The sky is blue.\n\npoison pill" })),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(report["chunkIds"].as_array().unwrap().len(), 1);
    assert_eq!(report["failures"][0]["index"], 1);
}

#[tokio::test]
async fn test_empty_ingest_is_400() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    let (status, _, _) = send(&app, post_json("/ingest", &json!({ "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_store_and_circuit() {
    let app = app(Arc::new(KeywordEmbedder), 3);
    let (status, _, health) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["provider"], "keyword");
    assert_eq!(health["chunkCount"], 0);
    assert_eq!(health["maxConcurrency"], 4);
}
