//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process deployments that ingest at
//! startup.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{NewRecord, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

#[derive(Debug)]
struct StoredRecord {
    id: String,
    record: NewRecord,
}

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    records: Vec<StoredRecord>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as collection name → records in insertion order.
/// Record IDs are random UUIDs. All operations are async-safe via
/// `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1024).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RagError::VectorStoreError {
                backend: "InMemory".to_string(),
                message: format!("collection '{name}' already exists"),
            });
        }
        collections.insert(name.to_string(), Collection { dimensions, records: Vec::new() });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn add_record(&self, collection: &str, record: NewRecord) -> Result<String> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        if record.embedding.len() != store.dimensions {
            return Err(RagError::VectorStoreError {
                backend: "InMemory".to_string(),
                message: format!(
                    "embedding has {} dimensions, collection '{collection}' expects {}",
                    record.embedding.len(),
                    store.dimensions
                ),
            });
        }
        let id = Uuid::new_v4().to_string();
        store.records.push(StoredRecord { id: id.clone(), record });
        Ok(id)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(store.records.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let mut scored: Vec<SearchResult> = store
            .records
            .iter()
            .map(|stored| SearchResult {
                id: stored.id.clone(),
                text: stored.record.text.clone(),
                score: cosine_similarity(&stored.record.embedding, embedding),
                metadata: stored.record.metadata.clone(),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn record(text: &str, embedding: Vec<f32>) -> NewRecord {
        NewRecord { embedding, text: text.to_string(), metadata: HashMap::new() }
    }

    #[tokio::test]
    async fn create_drop_and_count() {
        let store = InMemoryVectorStore::new();
        assert!(!store.has_collection("docs").await.unwrap());

        store.create_collection("docs", 2).await.unwrap();
        assert!(store.has_collection("docs").await.unwrap());
        assert!(store.create_collection("docs", 2).await.is_err());

        store.add_record("docs", record("a", vec![1.0, 0.0])).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);

        store.drop_collection("docs").await.unwrap();
        assert!(!store.has_collection("docs").await.unwrap());
        assert!(store.count("docs").await.is_err());
    }

    #[tokio::test]
    async fn rejects_wrong_dimensions() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 3).await.unwrap();
        let err = store.add_record("docs", record("a", vec![1.0])).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn search_ranks_by_cosine() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store.add_record("docs", record("far", vec![0.0, 1.0])).await.unwrap();
        store.add_record("docs", record("near", vec![1.0, 0.1])).await.unwrap();

        let results = store.search("docs", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "near");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn search_missing_collection_fails() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", &[1.0], 3).await.is_err());
    }

    #[test]
    fn zero_vector_has_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
