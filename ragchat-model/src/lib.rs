//! # ragchat-model
//!
//! Language model integrations for ragchat.
//!
//! ## Overview
//!
//! Every backend implements the [`LanguageModel`] trait: a list of chat
//! [`Message`]s goes in, the generated text comes out. The same interface is
//! used for query rewriting and for answer synthesis; only the prompts differ.
//!
//! - [`GeminiModel`] - Google's Gemini models via the Generative Language API
//! - [`OpenAICompatibleModel`] - any `/chat/completions` endpoint (OpenAI, GLM, DeepSeek, Ollama, vLLM)
//! - [`MockLlm`] - scripted model for tests and offline runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragchat_model::{GeminiModel, LanguageModel, Message};
//!
//! let model = GeminiModel::new(std::env::var("GOOGLE_API_KEY")?, "gemini-2.5-flash")?;
//! let answer = model.generate(&[Message::human("你好")]).await?;
//! ```

pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod llm;
pub mod message;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
#[cfg(feature = "gemini")]
pub use gemini::GeminiModel;
pub use llm::LanguageModel;
pub use message::{Message, Role};
pub use mock::MockLlm;
#[cfg(feature = "openai")]
pub use openai::OpenAICompatibleModel;
