//! OpenAI-compatible embedding provider.
//!
//! Talks to any `/embeddings` endpoint that follows the OpenAI wire format,
//! which includes OpenAI itself and Zhipu AI (`open.bigmodel.cn`).
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// Zhipu AI's OpenAI-compatible API base URL.
pub const ZHIPU_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Zhipu's general-purpose embedding model and its output size.
const ZHIPU_MODEL: &str = "embedding-2";
const ZHIPU_DIMENSIONS: usize = 1024;

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call the `{base_url}/embeddings` endpoint directly.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `base_url` – defaults to the OpenAI API; see [`OpenAIEmbeddingProvider::zhipu`].
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::zhipu(std::env::var("ZHIPUAI_API_KEY")?)?;
/// let embedding = provider.embed("长安一片月").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    provider: &'static str,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_provider("OpenAI", api_key.into(), OPENAI_API_BASE, DEFAULT_MODEL, DEFAULT_DIMENSIONS)
    }

    /// Create a provider for Zhipu AI's `embedding-2` model (1024 dimensions).
    pub fn zhipu(api_key: impl Into<String>) -> Result<Self> {
        Self::with_provider("Zhipu", api_key.into(), ZHIPU_API_BASE, ZHIPU_MODEL, ZHIPU_DIMENSIONS)
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    fn with_provider(
        provider: &'static str,
        api_key: String,
        base_url: &str,
        model: &str,
        dimensions: usize,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: provider.into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            dimensions,
            request_dimensions: None,
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`, `embedding-3`).
    ///
    /// Pair this with [`with_dimensions`](Self::with_dimensions) when the model's
    /// output size differs from the current default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

// ── Embeddings API request/response types ──────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = self.provider, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: self.provider.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = self.provider,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.provider, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: self.provider.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = self.provider, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: self.provider.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = self.provider, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: self.provider.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: self.provider.into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedding_response.data.len()
                ),
            });
        }

        // Results may come back out of order; `index` restores input order.
        embedding_response.data.sort_by_key(|d| d.index.unwrap_or(0));
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zhipu_defaults() {
        let provider = OpenAIEmbeddingProvider::zhipu("key").unwrap();
        assert_eq!(provider.base_url, ZHIPU_API_BASE);
        assert_eq!(provider.model, "embedding-2");
        assert_eq!(provider.dimensions(), 1024);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new(""),
            Err(RagError::EmbeddingError { .. })
        ));
    }

    #[test]
    fn dimensions_override_is_sent() {
        let provider = OpenAIEmbeddingProvider::new("key").unwrap().with_dimensions(256);
        let body = EmbeddingRequest {
            model: &provider.model,
            input: vec!["a"],
            dimensions: provider.request_dimensions,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["dimensions"], 256);
        assert_eq!(provider.dimensions(), 256);
    }
}
