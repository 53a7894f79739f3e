//! OpenAI and Azure OpenAI embedding provider adapter.
//!
//! Calls the `/embeddings` endpoint once per request and maps every failure
//! onto a typed [`EmbeddingError`] so the resilience wrapper can decide what
//! to retry. No retries happen here.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::EmbeddingError;
use crate::domain::models::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::ports::EmbeddingProvider;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Which request shape and auth header to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {base}/embeddings` with `Authorization: Bearer`
    OpenAi,
    /// `POST {base}/openai/deployments/{deployment}/embeddings?api-version=` with `api-key`
    Azure,
}

/// Configuration for the OpenAI embedding provider.
#[derive(Clone)]
pub struct OpenAiEmbeddingConfig {
    pub flavor: ApiFlavor,
    /// API key. Falls back to `OPENAI_API_KEY` / `AZURE_OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Model (OpenAI) or deployment name (Azure).
    pub deployment: String,
    /// Azure `api-version`.
    pub api_version: String,
    /// Expected embedding dimension.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Inputs longer than this are rejected before any request.
    pub max_input_chars: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&EmbeddingConfig::default(), 1536)
    }
}

impl fmt::Debug for OpenAiEmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddingConfig")
            .field("flavor", &self.flavor)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingConfig {
    /// Build from the `embedding` config section and the shared vector dimension.
    pub fn from_settings(settings: &EmbeddingConfig, dimension: usize) -> Self {
        let flavor = match settings.provider {
            EmbeddingProviderKind::Azure => ApiFlavor::Azure,
            EmbeddingProviderKind::OpenAi | EmbeddingProviderKind::Local => ApiFlavor::OpenAi,
        };
        Self {
            flavor,
            api_key: settings.api_key.clone(),
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            deployment: settings.deployment.clone(),
            api_version: settings.api_version.clone(),
            dimension,
            timeout_secs: settings.request_timeout_secs,
            max_input_chars: settings.max_input_chars,
        }
    }

    fn api_key(&self) -> Option<String> {
        let env_var = match self.flavor {
            ApiFlavor::OpenAi => "OPENAI_API_KEY",
            ApiFlavor::Azure => "AZURE_OPENAI_API_KEY",
        };
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(env_var).ok())
    }

    /// Endpoint URL for a single embeddings request.
    pub fn url(&self) -> String {
        match self.flavor {
            ApiFlavor::OpenAi => format!("{}/embeddings", self.base_url),
            ApiFlavor::Azure => format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                self.base_url, self.deployment, self.api_version
            ),
        }
    }
}

/// OpenAI / Azure OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .context("Embedding API key not set. Configure embedding.api_key or KBAE_EMBEDDING__API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn check_input(&self, text: &str) -> Result<(), EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }
        let chars = text.chars().count();
        if chars > self.config.max_input_chars {
            return Err(EmbeddingError::InvalidInput(format!(
                "text is {chars} characters, limit is {}",
                self.config.max_input_chars
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        match self.config.flavor {
            ApiFlavor::OpenAi => "openai",
            ApiFlavor::Azure => "azure",
        }
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    #[instrument(skip(self, text), fields(provider = self.name()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.check_input(text)?;

        let request = self.client.post(self.config.url()).json(&EmbeddingsRequest {
            model: &self.config.deployment,
            input: [text],
        });
        let request = match self.config.flavor {
            ApiFlavor::OpenAi => request.bearer_auth(&self.api_key),
            ApiFlavor::Azure => request.header("api-key", &self.api_key),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                EmbeddingError::ProviderUnavailable(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(classify_status(status, retry_after, body));
        }

        let result: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let embedding = result
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::MalformedResponse("no embedding in response".to_string()))?;

        if embedding.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        debug!(dimension = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

/// Map a non-success HTTP status onto an [`EmbeddingError`].
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> EmbeddingError {
    let body = truncate(body);
    match status.as_u16() {
        429 => EmbeddingError::RateLimited { retry_after },
        408 | 500 | 502 | 503 | 504 => {
            EmbeddingError::ProviderUnavailable(format!("{status}: {body}"))
        }
        400 | 413 | 422 => EmbeddingError::InvalidInput(format!("{status}: {body}")),
        401 | 403 => EmbeddingError::Unauthorized(format!("{status}: {body}")),
        code => EmbeddingError::Rejected { status: code, body },
    }
}

/// Delay hint from `retry-after-ms` (Azure) or `Retry-After` in seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
    };

    header("retry-after-ms")
        .map(|ms| Duration::from_secs_f64(ms / 1000.0))
        .or_else(|| header("retry-after").map(Duration::from_secs_f64))
}

fn truncate(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
