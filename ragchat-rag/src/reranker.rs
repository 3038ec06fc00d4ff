//! Reranker trait for re-scoring retrieved passages.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// A reranker that re-scores and reorders search results after vector search.
///
/// Implementations can use cross-encoder models, LLM-based scoring, or
/// lexical heuristics to improve precision beyond embedding similarity.
/// The retriever re-sorts by the returned scores, so implementations may
/// update scores without reordering themselves.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank search results given the standalone question.
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;
}

/// A reranker that boosts passages sharing characters with the query.
///
/// Each result's score becomes `score + weight * overlap`, where `overlap` is
/// the fraction of distinct non-whitespace query characters that appear in the
/// passage. Cheap and language-agnostic, which suits short CJK queries where
/// a single shared character (月, 诗) is a strong signal.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::LexicalOverlapReranker;
///
/// let reranker = LexicalOverlapReranker::new(0.5);
/// let reranked = reranker.rerank("月亮", results).await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LexicalOverlapReranker {
    weight: f32,
}

impl LexicalOverlapReranker {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Default for LexicalOverlapReranker {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl Reranker for LexicalOverlapReranker {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let mut query_chars: Vec<char> = query.chars().filter(|c| !c.is_whitespace()).collect();
        query_chars.sort_unstable();
        query_chars.dedup();
        if query_chars.is_empty() {
            return Ok(results);
        }

        Ok(results
            .into_iter()
            .map(|mut result| {
                let hits = query_chars.iter().filter(|c| result.text.contains(**c)).count();
                result.score += self.weight * hits as f32 / query_chars.len() as f32;
                result
            })
            .collect())
    }
}
