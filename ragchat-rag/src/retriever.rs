//! Read-only passage retrieval: embed → search → rerank → filter.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// Fetches the passages most relevant to a standalone question.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` passages ordered by non-increasing score.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if the question cannot be embedded,
    /// the store cannot be searched, or the collection holds no records.
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchResult>>;
}

/// A [`Retriever`] over one vector store collection.
///
/// The question is embedded with the same provider used at ingestion time,
/// so the two must match. An optional [`Reranker`] rescores the hits, after
/// which results are re-sorted and an optional similarity threshold drops
/// weak matches. Filtering may leave nothing; that is not an error here, the
/// synthesizer's grounding policy handles an empty context.
pub struct VectorRetriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    reranker: Option<Arc<dyn Reranker>>,
    similarity_threshold: Option<f32>,
}

impl VectorRetriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: collection.into(),
            reranker: None,
            similarity_threshold: None,
        }
    }

    /// Rescore hits after vector search.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Drop results scoring below `threshold` (applied after reranking).
    pub fn with_similarity_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let collection = self.collection.as_str();

        // 1. Embed the question
        let embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(collection, error = %e, "embedding failed during retrieval");
            RagError::RetrievalError(format!("question embedding failed: {e}"))
        })?;

        // 2. Search the vector store
        let results = self.vector_store.search(collection, &embedding, k).await.map_err(|e| {
            error!(collection, error = %e, "vector store search failed");
            RagError::RetrievalError(format!("search failed in collection '{collection}': {e}"))
        })?;
        if results.is_empty() {
            error!(collection, "search returned no records");
            return Err(RagError::RetrievalError(format!(
                "collection '{collection}' returned no records; has it been ingested?"
            )));
        }

        // 3. Rerank if a reranker is configured
        let mut results = match &self.reranker {
            Some(reranker) => reranker.rerank(question, results).await.map_err(|e| {
                error!(collection, error = %e, "reranking failed");
                RagError::RetrievalError(format!("reranking failed: {e}"))
            })?,
            None => results,
        };
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        // 4. Filter by similarity threshold
        if let Some(threshold) = self.similarity_threshold {
            let before = results.len();
            results.retain(|r| r.score >= threshold);
            debug!(collection, threshold, dropped = before - results.len(), "applied similarity threshold");
        }

        info!(collection, result_count = results.len(), "retrieval completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NewRecord;
    use crate::hashing::HashingEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;
    use crate::reranker::LexicalOverlapReranker;

    async fn seeded(texts: &[&str]) -> (Arc<HashingEmbeddingProvider>, Arc<InMemoryVectorStore>) {
        let embedder = Arc::new(HashingEmbeddingProvider::new(256));
        let store = Arc::new(InMemoryVectorStore::new());
        store.create_collection("docs", 256).await.unwrap();
        for text in texts {
            let embedding = embedder.embed(text).await.unwrap();
            store
                .add_record(
                    "docs",
                    NewRecord { embedding, text: text.to_string(), metadata: Default::default() },
                )
                .await
                .unwrap();
        }
        (embedder, store)
    }

    #[tokio::test]
    async fn returns_at_most_k_in_score_order() {
        let (embedder, store) = seeded(&["床前明月光", "疑是地上霜", "举头望明月", "低头思故乡"]).await;
        let retriever = VectorRetriever::new(embedder, store, "docs");

        let results = retriever.retrieve("明月", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn empty_collection_is_a_retrieval_error() {
        let (embedder, store) = seeded(&[]).await;
        let retriever = VectorRetriever::new(embedder, store, "docs");

        assert!(matches!(retriever.retrieve("明月", 3).await, Err(RagError::RetrievalError(_))));
    }

    #[tokio::test]
    async fn missing_collection_is_a_retrieval_error() {
        let (embedder, store) = seeded(&["床前明月光"]).await;
        let retriever = VectorRetriever::new(embedder, store, "nope");

        let err = retriever.retrieve("明月", 3).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalError(_)));
        assert_eq!(err.stage(), Some(crate::error::Stage::Retrieve));
    }

    #[tokio::test]
    async fn threshold_may_leave_an_empty_context() {
        let (embedder, store) = seeded(&["天气晴朗"]).await;
        let retriever =
            VectorRetriever::new(embedder, store, "docs").with_similarity_threshold(Some(0.99));

        let results = retriever.retrieve("量子计算的原理是什么", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn reranked_results_are_resorted() {
        let (embedder, store) = seeded(&["长安一片月", "天气晴朗"]).await;
        let retriever = VectorRetriever::new(embedder, store, "docs")
            .with_reranker(Arc::new(LexicalOverlapReranker::new(5.0)));

        let results = retriever.retrieve("月亮", 2).await.unwrap();
        assert_eq!(results[0].text, "长安一片月");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
