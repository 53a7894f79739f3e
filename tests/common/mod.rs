//! Common test utilities for integration tests
//!
//! Provides test embedders and wiring helpers shared across the
//! integration test files.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use knowledge_bae::domain::errors::EmbeddingError;
use knowledge_bae::domain::ports::EmbeddingProvider;
use knowledge_bae::services::{
    Bulkhead, CircuitBreaker, CircuitBreakerConfig, ResilientEmbedder, RetryPolicy,
};

/// Dimension of the keyword embedder's vectors.
pub const KEYWORD_DIMS: usize = 4;

/// Embeds text onto fixed axes chosen by keyword:
/// sky/blue, water/wet, fire/hot, plus a small constant "other" component.
#[derive(Debug, Default)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v = vec![0.0_f32; KEYWORD_DIMS];
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            match word {
                "sky" | "blue" => v[0] += 1.0,
                "water" | "wet" => v[1] += 1.0,
                "fire" | "hot" => v[2] += 1.0,
                _ => {}
            }
        }
        v[3] = 0.1;
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        Ok(Self::vector(text))
    }
}

/// Fails with the scripted errors in order, then embeds like [`KeywordEmbedder`].
/// Texts containing `poison` always fail as unavailable.
pub struct ScriptedEmbedder {
    script: Mutex<Vec<EmbeddingError>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedEmbedder {
    pub fn new(script: Vec<EmbeddingError>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut script: Vec<EmbeddingError>, delay: Duration) -> Arc<Self> {
        script.reverse();
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if text.contains("poison") {
            return Err(EmbeddingError::ProviderUnavailable("poisoned".to_string()));
        }
        if let Some(err) = self.script.lock().unwrap().pop() {
            return Err(err);
        }
        Ok(KeywordEmbedder::vector(text))
    }
}

/// Records how many calls are in flight at once.
pub struct ConcurrencyTrackingEmbedder {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyTrackingEmbedder {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ConcurrencyTrackingEmbedder {
    fn name(&self) -> &'static str {
        "tracking"
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(KeywordEmbedder::vector(text))
    }
}

/// Wrap a provider with explicit resilience settings.
pub fn resilient(
    provider: Arc<dyn EmbeddingProvider>,
    max_concurrency: usize,
    max_retries: u32,
    failure_threshold: u32,
) -> Arc<ResilientEmbedder> {
    Arc::new(ResilientEmbedder::with_parts(
        provider,
        Bulkhead::new(max_concurrency, None),
        Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            cool_down: Duration::from_secs(30),
            enabled: true,
        })),
        RetryPolicy::new(max_retries, 100, 1000),
        Duration::from_secs(5),
    ))
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
