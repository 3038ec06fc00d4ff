//! Local feature-hashing embedding provider.
//!
//! [`HashingEmbeddingProvider`] needs no network access or model weights. It
//! hashes character unigrams and bigrams into a fixed number of buckets and
//! L2-normalizes the counts. Lexical overlap is all it captures, which is
//! enough for development, demos, and tests, but not a substitute for a real
//! embedding model.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Default number of hash buckets.
const DEFAULT_DIMENSIONS: usize = 1024;

/// A deterministic, dependency-free [`EmbeddingProvider`].
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::HashingEmbeddingProvider;
///
/// let provider = HashingEmbeddingProvider::new(512);
/// let a = provider.embed("长安一片月").await?;
/// let b = provider.embed("长安一片月").await?;
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbeddingProvider {
    /// Create a provider with the given number of buckets (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hash = FNV_OFFSET;
        for byte in feature.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        (hash % self.dimensions as u64) as usize
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();

        let mut buf = [0u8; 8];
        for c in &chars {
            vector[self.bucket(c.encode_utf8(&mut buf))] += 1.0;
        }
        for pair in chars.windows(2) {
            let bigram: String = pair.iter().collect();
            vector[self.bucket(&bigram)] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("长安一片月，万户捣衣声").await.unwrap();
        let b = provider.embed("长安一片月，万户捣衣声").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn vectors_are_unit_length_or_zero() {
        let provider = HashingEmbeddingProvider::default();
        let v = provider.embed("天气晴朗").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let empty = provider.embed("   ").await.unwrap();
        assert!(empty.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let provider = HashingEmbeddingProvider::new(128);
        let batch = provider.embed_batch(&["床前明月光", "疑是地上霜"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("床前明月光").await.unwrap());
        assert_eq!(batch[1], provider.embed("疑是地上霜").await.unwrap());
    }
}
