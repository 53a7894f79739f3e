use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, EmbeddingProviderKind, StoreBackend};
use crate::infrastructure::vector::TableName;

/// Largest dimension pgvector can index with HNSW.
const MAX_VECTOR_DIMENSIONS: usize = 16_000;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Embedding endpoint cannot be empty for provider '{0}'")]
    MissingEndpoint(String),

    #[error("Embedding deployment/model cannot be empty for provider '{0}'")]
    MissingDeployment(String),

    #[error(
        "Embedding API key is required for provider '{0}' (set KBAE_EMBEDDING__API_KEY or OPENAI_API_KEY)"
    )]
    MissingApiKey(String),

    #[error("Database url cannot be empty when store.backend is postgres (set KBAE_DATABASE__URL)")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid collection_name: {0}")]
    InvalidCollectionName(String),

    #[error("Invalid vector_dimensions: {0}. Must be between 1 and 16000")]
    InvalidVectorDimensions(usize),

    #[error("Invalid result counts: default_k ({0}) must be between 1 and max_k ({1})")]
    InvalidK(usize, usize),

    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid attempt_timeout_ms: {0}. Must be positive")]
    InvalidAttemptTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid failure_threshold: {0}. Must be at least 1")]
    InvalidFailureThreshold(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid server bind address: {0}")]
    InvalidBindAddress(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .kbae/config.yaml (project config)
    /// 3. .kbae/local.yaml (local overrides, kept out of version control)
    /// 4. Environment variables (KBAE_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".kbae/config.yaml"))
            .merge(Yaml::file(".kbae/local.yaml"))
            .merge(Env::prefixed("KBAE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        anyhow::ensure!(path.exists(), "Config file {} not found", path.display());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("KBAE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Embedding provider
        let embedding = &config.embedding;
        if embedding.provider.is_remote() {
            let provider = format!("{:?}", embedding.provider).to_lowercase();
            if embedding.endpoint.trim().is_empty() {
                return Err(ConfigError::MissingEndpoint(provider));
            }
            if embedding.deployment.trim().is_empty() {
                return Err(ConfigError::MissingDeployment(provider));
            }
            let fallback_var = match embedding.provider {
                EmbeddingProviderKind::Azure => "AZURE_OPENAI_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            let configured = embedding
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty());
            if !configured && std::env::var(fallback_var).map_or(true, |k| k.is_empty()) {
                return Err(ConfigError::MissingApiKey(provider));
            }
        }

        // Database
        if config.store.backend == StoreBackend::Postgres {
            if config.database.url.trim().is_empty() {
                return Err(ConfigError::EmptyDatabaseUrl);
            }
            if config.database.max_connections == 0 {
                return Err(ConfigError::InvalidMaxConnections(
                    config.database.max_connections,
                ));
            }
        }

        // Search
        let search = &config.search;
        TableName::parse(&search.collection_name)
            .map_err(|e| ConfigError::InvalidCollectionName(e.to_string()))?;

        if search.vector_dimensions == 0 || search.vector_dimensions > MAX_VECTOR_DIMENSIONS {
            return Err(ConfigError::InvalidVectorDimensions(search.vector_dimensions));
        }

        if search.default_k == 0 || search.default_k > search.max_k {
            return Err(ConfigError::InvalidK(search.default_k, search.max_k));
        }

        // Resilience
        let resilience = &config.resilience;
        if resilience.max_concurrency == 0 {
            return Err(ConfigError::InvalidMaxConcurrency(resilience.max_concurrency));
        }

        if resilience.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidAttemptTimeout(resilience.attempt_timeout_ms));
        }

        if resilience.retry.initial_backoff_ms > resilience.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                resilience.retry.initial_backoff_ms,
                resilience.retry.max_backoff_ms,
            ));
        }

        if resilience.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(
                resilience.circuit_breaker.failure_threshold,
            ));
        }

        if let Some(rate_limit) = &resilience.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(ConfigError::InvalidRateLimit(rate_limit.requests_per_second));
            }
            if rate_limit.burst_size == 0 {
                return Err(ConfigError::InvalidBurstSize(rate_limit.burst_size));
            }
        }

        // Chunking
        config
            .chunking
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        // Server
        config
            .server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(config.server.bind.clone()))?;

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
