//! Gemini chat model using the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::llm::LanguageModel;
use crate::message::{Message, Role};

/// The default Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Temperature used unless overridden; low to keep answers close to the context.
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// A [`LanguageModel`] backed by Google's Gemini `generateContent` endpoint.
///
/// System messages are sent as `systemInstruction`; human and assistant
/// messages become `user` and `model` contents.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_model::GeminiModel;
///
/// let model = GeminiModel::new(api_key, "gemini-2.5-flash")?.with_temperature(0.1);
/// ```
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiModel {
    /// Create a new Gemini model client.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ModelError::ConfigError("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a client from the `GOOGLE_API_KEY` (or `GEMINI_API_KEY`) environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| ModelError::ConfigError("GOOGLE_API_KEY environment variable not set".into()))?;
        Self::new(api_key, model)
    }

    /// Override the API base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, messages: &[Message]) -> GenerateRequest {
        let system: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part { text: m.content.clone() })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: if m.role == Role::Assistant { "model" } else { "user" }.to_string(),
                parts: vec![Part { text: m.content.clone() }],
            })
            .collect();

        GenerateRequest {
            system_instruction: (!system.is_empty()).then_some(SystemInstruction { parts: system }),
            contents,
            generation_config: GenerationConfig { temperature: self.temperature },
        }
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
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
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, message_count = messages.len(), "generating");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(messages))
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                ModelError::Request { provider: "Gemini".into(), message: e.to_string() }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Gemini", %status, "API error");
            return Err(ModelError::Api {
                provider: "Gemini".into(),
                status: status.as_u16(),
                message: detail,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse response");
            ModelError::InvalidResponse { provider: "Gemini".into(), message: e.to_string() }
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse { provider: "Gemini".into() });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_become_system_instruction() {
        let model = GeminiModel::new("key", "gemini-2.5-flash").unwrap();
        let request = model.build_request(&[
            Message::system("只改写问题"),
            Message::human("这首诗的作者是谁"),
            Message::assistant("李白"),
            Message::human("他还写了什么诗"),
        ]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "只改写问题");
        let roles: Vec<&str> =
            json["contents"].as_array().unwrap().iter().map(|c| c["role"].as_str().unwrap()).collect();
        assert_eq!(roles, ["user", "model", "user"]);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(GeminiModel::new("", "gemini-2.5-flash"), Err(ModelError::ConfigError(_))));
    }
}
