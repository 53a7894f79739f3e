//! Deterministic local embedding provider
//!
//! Feature hashing over lower-cased alphanumeric tokens: each token lands in
//! one of `dimension` buckets with a hash-derived sign, and the result is
//! L2-normalised. Texts sharing words get similar vectors. Needs no network
//! or credentials, which makes it suitable for development and tests.
//!
//! Tokens are hashed with BLAKE3, so vectors stored by one build keep
//! matching queries embedded by any later build.

use async_trait::async_trait;

use crate::domain::errors::EmbeddingError;
use crate::domain::ports::EmbeddingProvider;
use crate::infrastructure::vector::similarity::normalize;

/// Feature-hashing embedder
#[derive(Debug, Clone)]
pub struct LocalEmbeddingProvider {
    dimension: usize,
}

impl LocalEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Compute the embedding synchronously
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in tokens(text) {
            let hash = token_hash(&token);

            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

/// First 8 bytes of the token's BLAKE3 digest, little-endian
fn token_hash(token: &str) -> u64 {
    let digest = blake3::hash(token.as_bytes());
    let mut head = [0_u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if tokens(text).next().is_none() {
            return Err(EmbeddingError::InvalidInput(
                "text has no embeddable tokens".to_string(),
            ));
        }
        Ok(self.embed_sync(text))
    }
}
