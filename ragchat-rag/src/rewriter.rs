//! History-aware query reformulation.
//!
//! Follow-up questions such as "他还写了什么诗" cannot be retrieved on their own:
//! the referent lives in an earlier turn. A [`QueryRewriter`] turns the latest
//! question into a standalone one before it reaches the retriever.

use std::sync::Arc;

use async_trait::async_trait;
use ragchat_model::{LanguageModel, Message};
use tracing::{debug, error};

use crate::error::{RagError, Result, Stage};
use crate::history::ConversationHistory;

/// Default instruction for the rewriting model.
pub const DEFAULT_REWRITE_INSTRUCTION: &str = "参考下面的对话历史和用户提出的最新问题，这个问题可能会引用对话历史中的上下文。
请将这个问题改写成一个独立的、完整的、无需参考对话历史就能理解的新问题。
注意：你只需要改写问题，不要回答问题。如果问题本身已经很完整，无需改写，就直接返回原问题。";

/// Turns a follow-up question into a standalone question.
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// Rewrite `question` so it can be understood without `history`.
    ///
    /// Implementations must return `question` unchanged when `history` is empty.
    async fn rewrite(&self, history: &ConversationHistory, question: &str) -> Result<String>;
}

/// A [`QueryRewriter`] that asks a language model to reformulate the question.
///
/// The model receives the rewrite instruction as a system message, the
/// conversation as alternating human/assistant messages, and the new question
/// last. With an empty history the model is not called at all.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{ConversationHistory, LlmQueryRewriter, QueryRewriter};
///
/// let rewriter = LlmQueryRewriter::new(model);
/// let history = ConversationHistory::from_pairs([("这首诗的作者是谁", "李白")]);
/// let standalone = rewriter.rewrite(&history, "他还写了什么诗").await?;
/// ```
pub struct LlmQueryRewriter {
    model: Arc<dyn LanguageModel>,
    instruction: String,
}

impl LlmQueryRewriter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, instruction: DEFAULT_REWRITE_INSTRUCTION.to_string() }
    }

    /// Replace the system instruction. It should forbid answering the question.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// The messages sent to the model for a non-empty history.
    pub fn build_messages(&self, history: &ConversationHistory, question: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.instruction.clone()));
        messages.extend(history.to_messages());
        messages.push(Message::human(question));
        messages
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(&self, history: &ConversationHistory, question: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let messages = self.build_messages(history, question);
        let rewritten = self.model.generate(&messages).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "query rewrite failed");
            RagError::GenerationError { stage: Stage::Rewrite, message: e.to_string() }
        })?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return Err(RagError::GenerationError {
                stage: Stage::Rewrite,
                message: format!("{} returned a blank rewrite", self.model.name()),
            });
        }

        debug!(original = question, rewritten, "rewrote question");
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use ragchat_model::{MockLlm, Role};

    use super::*;

    #[tokio::test]
    async fn empty_history_passes_through_without_model_call() {
        let llm = Arc::new(MockLlm::new("mock").with_reply("should not be used"));
        let rewriter = LlmQueryRewriter::new(llm.clone());

        let out = rewriter.rewrite(&ConversationHistory::new(), "量子计算的原理是什么").await.unwrap();
        assert_eq!(out, "量子计算的原理是什么");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn history_is_sent_between_instruction_and_question() {
        let llm = Arc::new(MockLlm::new("mock").with_reply("  李白还写了哪些诗？\n"));
        let rewriter = LlmQueryRewriter::new(llm.clone());
        let history = ConversationHistory::from_pairs([("这首诗的作者是谁", "李白")]);

        let out = rewriter.rewrite(&history, "他还写了什么诗").await.unwrap();
        assert_eq!(out, "李白还写了哪些诗？");

        let calls = llm.calls();
        let roles: Vec<Role> = calls[0].iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::Human, Role::Assistant, Role::Human]);
        assert!(calls[0][0].content.contains("不要回答问题"));
        assert_eq!(calls[0][3].content, "他还写了什么诗");
    }

    #[tokio::test]
    async fn model_failure_is_a_rewrite_generation_error() {
        let llm = Arc::new(MockLlm::new("mock").with_failure("timeout"));
        let rewriter = LlmQueryRewriter::new(llm);
        let history = ConversationHistory::from_pairs([("q", "a")]);

        let err = rewriter.rewrite(&history, "follow up").await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Rewrite));
    }

    #[tokio::test]
    async fn blank_rewrite_is_rejected() {
        let llm = Arc::new(MockLlm::new("mock").with_reply("   "));
        let rewriter = LlmQueryRewriter::new(llm);
        let history = ConversationHistory::from_pairs([("q", "a")]);

        assert!(matches!(
            rewriter.rewrite(&history, "follow up").await,
            Err(RagError::GenerationError { stage: Stage::Rewrite, .. })
        ));
    }
}
