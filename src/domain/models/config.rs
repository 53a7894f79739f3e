use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::chunking::ChunkingConfig;

/// Main configuration structure for Knowledge Bae
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Search behaviour and vector layout
    #[serde(default)]
    pub search: SearchConfig,

    /// Vector store backend selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Bulkhead, retry and circuit breaker policy for embedding calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Document chunking policy
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which embedding API to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint with bearer auth
    #[serde(alias = "open_ai")]
    OpenAi,
    /// Azure OpenAI deployment endpoint with `api-key` auth
    Azure,
    /// Deterministic in-process hashing embedder (no network)
    Local,
}

impl EmbeddingProviderKind {
    /// Returns true if the provider needs an endpoint and credentials
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Embedding provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider flavour
    #[serde(default = "default_provider")]
    pub provider: EmbeddingProviderKind,

    /// Base URL, e.g. `https://api.openai.com/v1` or `https://<resource>.openai.azure.com`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key (never logged)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (OpenAI) or deployment name (Azure)
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Azure `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Longest input accepted before the call is rejected as invalid
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// HTTP client ceiling for a single request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::OpenAi
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_deployment() -> String {
    "text-embedding-3-small".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

const fn default_max_input_chars() -> usize {
    8000
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            deployment: default_deployment(),
            api_version: default_api_version(),
            max_input_chars: default_max_input_chars(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[serde(default)]
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Embedding dimension shared by provider and store
    #[serde(default = "default_vector_dimensions")]
    pub vector_dimensions: usize,

    /// Chunk table name, optionally schema-qualified
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Result count when the caller does not ask for one
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Larger requests are clamped to this
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// Results below this cosine similarity are dropped
    #[serde(default)]
    pub min_score: Option<f32>,

    /// HNSW candidate list size at query time
    #[serde(default)]
    pub ef_search: Option<u32>,
}

const fn default_vector_dimensions() -> usize {
    1536
}

fn default_collection_name() -> String {
    "chunks".to_string()
}

const fn default_k() -> usize {
    5
}

const fn default_max_k() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_dimensions: default_vector_dimensions(),
            collection_name: default_collection_name(),
            default_k: default_k(),
            max_k: default_max_k(),
            min_score: None,
            ef_search: None,
        }
    }
}

/// Vector store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// pgvector table with an HNSW index
    #[default]
    Postgres,
    /// Exact in-process store, contents lost on exit
    Memory,
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Which backend to use
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Resilience policy for outbound embedding calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResilienceConfig {
    /// Bulkhead size: concurrent in-flight embedding calls, process-wide
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// How long a call may wait for a bulkhead slot (`None` waits forever)
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: Option<u64>,

    /// Time budget for a single attempt
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker policy
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,

    /// Optional outbound token bucket
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

const fn default_max_concurrency() -> usize {
    10
}

#[allow(clippy::unnecessary_wraps)]
const fn default_queue_timeout_ms() -> Option<u64> {
    Some(30_000)
}

const fn default_attempt_timeout_ms() -> u64 {
    15_000
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            queue_timeout_ms: default_queue_timeout_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: None,
        }
    }
}

impl ResilienceConfig {
    /// Queue timeout as a `Duration`
    pub fn queue_timeout(&self) -> Option<Duration> {
        self.queue_timeout_ms.map(Duration::from_millis)
    }

    /// Attempt timeout as a `Duration`
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitBreakerSettings {
    /// Disabled breakers never open
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Consecutive failed calls that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long the circuit stays open before a trial call
    #[serde(default = "default_cool_down_ms")]
    pub cool_down_ms: u64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_cool_down_ms() -> u64 {
    30_000
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            failure_threshold: default_failure_threshold(),
            cool_down_ms: default_cool_down_ms(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_burst_size() -> u32 {
    1
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
