//! OpenAI-compatible chat completion client.
//!
//! Works with any endpoint that speaks the `/chat/completions` protocol:
//! OpenAI itself, Zhipu GLM, DeepSeek, Ollama (`/v1`), vLLM.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::llm::LanguageModel;
use crate::message::Message;

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// A [`LanguageModel`] backed by an OpenAI-compatible chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_model::OpenAICompatibleModel;
///
/// // Zhipu GLM
/// let glm = OpenAICompatibleModel::new(api_key, "glm-4.6")?
///     .with_base_url("https://open.bigmodel.cn/api/paas/v4");
///
/// // Local Ollama, no key required
/// let local = OpenAICompatibleModel::new("", "qwen3:0.6b")?
///     .with_base_url("http://localhost:11434/v1");
/// ```
pub struct OpenAICompatibleModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAICompatibleModel {
    /// Create a new client. An empty key is allowed for local servers.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.is_empty() {
            return Err(ModelError::ConfigError("model name must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model,
            base_url: OPENAI_API_BASE.into(),
            temperature: None,
            max_tokens: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage { role: m.role.as_openai_str(), content: &m.content })
                .collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

// ── Chat completion request/response types ─────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── LanguageModel implementation ───────────────────────────────────

#[async_trait]
impl LanguageModel for OpenAICompatibleModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        debug!(provider = "OpenAI", model = %self.model, message_count = messages.len(), "generating");

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&self.build_request(messages));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "request failed");
            ModelError::Request { provider: "OpenAI".into(), message: e.to_string() }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "OpenAI", %status, "API error");
            return Err(ModelError::Api {
                provider: "OpenAI".into(),
                status: status.as_u16(),
                message: detail,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            ModelError::InvalidResponse { provider: "OpenAI".into(), message: e.to_string() }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ModelError::EmptyResponse { provider: "OpenAI".into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_openai_role_names() {
        let model = OpenAICompatibleModel::new("", "glm-4.6").unwrap().with_temperature(0.2);
        let messages = [Message::system("s"), Message::human("q"), Message::assistant("a")];
        let json = serde_json::to_value(model.build_request(&messages)).unwrap();

        let roles: Vec<&str> =
            json["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, ["system", "user", "assistant"]);
        assert_eq!(json["model"], "glm-4.6");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let model = OpenAICompatibleModel::new("k", "m").unwrap().with_base_url("http://localhost:11434/v1/");
        assert_eq!(model.base_url, "http://localhost:11434/v1");
    }
}
