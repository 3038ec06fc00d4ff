//! The language model trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// A text-generating language model.
///
/// Implementations take the full message list for one call and return the
/// generated text. They hold no per-conversation state, so a single instance
/// can serve concurrent requests.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_model::{LanguageModel, Message};
///
/// let reply = model
///     .generate(&[Message::system("Answer briefly."), Message::human("What is RAG?")])
///     .await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The model identifier, used in logs.
    fn name(&self) -> &str;

    /// Generate a reply for the given messages.
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}
