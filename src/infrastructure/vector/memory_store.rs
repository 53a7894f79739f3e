//! In-process vector store
//!
//! Exact cosine scan over a copy-on-write snapshot. Writers swap in a new
//! snapshot; readers clone the current `Arc` and scan it without holding the
//! lock, so a search never waits on an in-progress insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::similarity::cosine_similarity;
use crate::domain::errors::StoreError;
use crate::domain::models::{Chunk, NewChunk, ScoredChunk};
use crate::domain::ports::VectorStore;

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    seq: u64,
}

/// Exact in-memory vector store
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimensions: usize,
    entries: RwLock<Arc<Vec<Entry>>>,
}

impl MemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    async fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&*self.entries.read().await)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert(&self, chunk: NewChunk) -> Result<Uuid, StoreError> {
        chunk.validate(self.dimensions)?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let stored = Chunk {
            id,
            text: chunk.text,
            reference_description: chunk.reference_description,
            reference_link: chunk.reference_link,
            embedding: Some(chunk.embedding),
            created_at: now,
            updated_at: now,
        };

        let mut guard = self.entries.write().await;
        let entries = Arc::make_mut(&mut *guard);
        let seq = entries.len() as u64;
        entries.push(Entry { chunk: stored, seq });
        Ok(id)
    }

    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK);
        }
        if query.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let snapshot = self.snapshot().await;
        let mut scored: Vec<(f32, u64, &Chunk)> = snapshot
            .iter()
            .filter_map(|entry| {
                let embedding = entry.chunk.embedding.as_deref()?;
                let score = cosine_similarity(query, embedding)?;
                Some((score, entry.seq, &entry.chunk))
            })
            .filter(|(score, _, _)| threshold.map_or(true, |min| *score >= min))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, _, chunk)| ScoredChunk {
                chunk: Chunk {
                    embedding: None,
                    ..chunk.clone()
                },
                score,
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Chunk>, StoreError> {
        Ok(self
            .snapshot()
            .await
            .iter()
            .find(|entry| entry.chunk.id == id)
            .map(|entry| entry.chunk.clone()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.snapshot().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryVectorStore::new(2);
        let id = store
            .insert(NewChunk::new("The sky is blue.", vec![1.0, 0.0]))
            .await
            .unwrap();

        let chunk = store.get(id).await.unwrap().unwrap();
        assert_eq!(chunk.text, "The sky is blue.");
        assert_eq!(chunk.embedding, Some(vec![1.0, 0.0]));
        assert_eq!(chunk.created_at, chunk.updated_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_dimension() {
        let store = MemoryVectorStore::new(3);
        let result = store.insert(NewChunk::new("text", vec![1.0, 0.0])).await;
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nearest_orders_by_score() {
        let store = MemoryVectorStore::new(2);
        store.insert(NewChunk::new("far", vec![0.0, 1.0])).await.unwrap();
        store.insert(NewChunk::new("near", vec![1.0, 0.1])).await.unwrap();
        store.insert(NewChunk::new("mid", vec![1.0, 1.0])).await.unwrap();

        let hits = store.nearest(&[1.0, 0.0], 10, None).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid", "far"]);
        assert!(hits.iter().all(|h| h.chunk.embedding.is_none()));
    }

    #[tokio::test]
    async fn test_ties_broken_by_insertion_order() {
        let store = MemoryVectorStore::new(2);
        let first = store.insert(NewChunk::new("first", vec![1.0, 0.0])).await.unwrap();
        let second = store.insert(NewChunk::new("second", vec![2.0, 0.0])).await.unwrap();

        let hits = store.nearest(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].chunk.id, first);
        assert_eq!(hits[1].chunk.id, second);
    }

    #[tokio::test]
    async fn test_k_and_threshold() {
        let store = MemoryVectorStore::new(2);
        store.insert(NewChunk::new("a", vec![1.0, 0.0])).await.unwrap();
        store.insert(NewChunk::new("b", vec![0.0, 1.0])).await.unwrap();
        store.insert(NewChunk::new("c", vec![-1.0, 0.0])).await.unwrap();

        assert_eq!(store.nearest(&[1.0, 0.0], 1, None).await.unwrap().len(), 1);

        let above = store.nearest(&[1.0, 0.0], 10, Some(0.0)).await.unwrap();
        assert_eq!(above.len(), 2);
        assert!(above.iter().all(|h| h.score >= 0.0));

        assert!(matches!(
            store.nearest(&[1.0, 0.0], 0, None).await,
            Err(StoreError::InvalidK)
        ));
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = MemoryVectorStore::new(2);
        assert!(store.nearest(&[1.0, 0.0], 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reader_snapshot_unaffected_by_insert() {
        let store = Arc::new(MemoryVectorStore::new(2));
        store.insert(NewChunk::new("a", vec![1.0, 0.0])).await.unwrap();

        let snapshot = store.snapshot().await;
        store.insert(NewChunk::new("b", vec![1.0, 0.0])).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
