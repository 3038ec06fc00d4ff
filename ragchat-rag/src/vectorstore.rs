//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{NewRecord, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of records. There is no upsert:
/// records are appended, and a collection is rebuilt by dropping and
/// recreating it.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1024).await?;
/// let id = store.add_record("docs", record).await?;
/// let results = store.search("docs", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether a collection with this name exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Create an empty collection. Fails if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Append one record and return its store-assigned ID.
    async fn add_record(&self, collection: &str, record: NewRecord) -> Result<String>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Search for the `top_k` most similar records to the given embedding.
    ///
    /// Returns at most `top_k` results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
