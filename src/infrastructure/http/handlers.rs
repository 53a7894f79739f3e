//! Request handlers and error mapping for the search API.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use super::server::AppState;
use crate::domain::errors::{IngestionError, RetrievalError};
use crate::domain::models::{IngestionReport, SearchRequest, SearchResponse};
use crate::services::{CircuitState, CircuitStats, Document};

/// Query parameters for `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    /// Signed so that negative values reach validation instead of failing extraction
    #[serde(default)]
    pub k: Option<i64>,
    #[serde(default)]
    pub min_score: Option<f32>,
}

/// Body for `POST /ingest`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub text: String,
    #[serde(default)]
    pub reference_description: Option<String>,
    #[serde(default)]
    pub reference_link: Option<String>,
}

/// Response for `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: &'static str,
    pub circuit: CircuitStats,
    pub in_flight: usize,
    pub max_concurrency: usize,
    /// None when the store could not be reached
    pub chunk_count: Option<u64>,
}

/// Response for `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying the status code and optional retry hint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Status code this error maps to
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        let message = err.to_string();
        match err {
            RetrievalError::InvalidQuery(_) => Self::bad_request(message),
            RetrievalError::Unavailable { retry_after, .. } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message,
                // Round up so clients never retry early
                retry_after_secs: retry_after
                    .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0)),
            },
            RetrievalError::EmbeddingRejected(_) => Self {
                status: StatusCode::BAD_GATEWAY,
                message,
                retry_after_secs: None,
            },
            RetrievalError::Store(_) => {
                tracing::error!(error = %message, "vector store failure during search");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message,
                    retry_after_secs: None,
                }
            }
        }
    }
}

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::InvalidInput(_) => Self::bad_request(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response();

        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub async fn greeting() -> Json<GreetingResponse> {
    Json(GreetingResponse {
        message: "Hello World from Knowledge Bae API!".to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let chunk_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not count chunks");
            None
        }
    };
    let circuit = state.embedder.breaker().stats();
    let status = if circuit.state == CircuitState::Open || chunk_count.is_none() {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        provider: state.embedder.provider_name(),
        circuit,
        in_flight: state.embedder.bulkhead().in_flight(),
        max_concurrency: state.embedder.bulkhead().max_concurrency(),
        chunk_count,
    })
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter is required"))?;

    let mut request = SearchRequest::new(query.clone());
    if let Some(k) = params.k {
        let k = usize::try_from(k)
            .ok()
            .filter(|k| *k > 0)
            .ok_or_else(|| ApiError::bad_request(format!("k must be a positive integer, got {k}")))?;
        request = request.with_k(k);
    }
    if let Some(min_score) = params.min_score {
        request = request.with_min_score(min_score);
    }

    let results = state.retrieval.search(request).await?;
    Ok(Json(SearchResponse { query, results }))
}

pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestionReport>), ApiError> {
    let mut document = Document::new(body.text);
    if let Some(description) = body.reference_description {
        document = document.with_description(description);
    }
    if let Some(link) = body.reference_link {
        document = document.with_link(link);
    }

    let report = state.ingestion.ingest(document).await?;
    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(report)))
}
