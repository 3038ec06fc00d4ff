//! Grounded answer generation.
//!
//! The [`AnswerSynthesizer`] renders a [`PromptTemplate`] with the retrieved
//! passages, the conversation, and the user's question, and returns the
//! model's answer. Grounding is a prompt-level contract: the model is told to
//! answer only from the supplied context and to reply with a fixed refusal
//! text otherwise. [`AnswerSynthesizer::is_refusal`] checks for that text.

use std::sync::Arc;

use ragchat_model::{LanguageModel, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::SearchResult;
use crate::error::{RagError, Result, Stage};
use crate::history::ConversationHistory;

/// Default refusal text the model must return when the context lacks an answer.
pub const DEFAULT_REFUSAL_TEXT: &str = "根据我所掌握的资料，无法回答您的问题。";

/// Separator placed between passages in the context block.
const PASSAGE_SEPARATOR: &str = "\n\n";

/// Declarative description of the answer prompt.
///
/// `{refusal}` in `refusal_instruction` and `{question}` in `question_slot`
/// are substituted at render time. The system message is
/// `role_instructions + refusal_instruction`, a blank line, then
/// `context_slot` followed by the passages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub role_instructions: String,
    pub refusal_instruction: String,
    /// Heading of the context block.
    pub context_slot: String,
    /// Whether prior turns are sent between the system message and the question.
    pub history_slot: bool,
    pub question_slot: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            role_instructions: "你是一个专业的问答助手。请使用下面提供的“背景资料”来回答用户提出的“问题”。"
                .to_string(),
            refusal_instruction: "如果找不到答案，请直接说“{refusal}”".to_string(),
            context_slot: "背景资料:".to_string(),
            history_slot: true,
            question_slot: "{question}".to_string(),
        }
    }
}

impl PromptTemplate {
    /// Render the chat messages for one request.
    pub fn render(
        &self,
        refusal_text: &str,
        question: &str,
        context: &[SearchResult],
        history: &ConversationHistory,
    ) -> Vec<Message> {
        let context_block =
            context.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(PASSAGE_SEPARATOR);
        let system = format!(
            "{}{}\n\n{}\n{}",
            self.role_instructions,
            self.refusal_instruction.replace("{refusal}", refusal_text),
            self.context_slot,
            context_block
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        if self.history_slot {
            messages.extend(history.to_messages());
        }
        messages.push(Message::human(self.question_slot.replace("{question}", question)));
        messages
    }
}

/// Produces a grounded answer from retrieved passages.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::AnswerSynthesizer;
///
/// let synthesizer = AnswerSynthesizer::new(model);
/// let answer = synthesizer.answer("月亮", &passages, &history).await?;
/// if synthesizer.is_refusal(&answer) {
///     // nothing in the context answered the question
/// }
/// ```
pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
    template: PromptTemplate,
    refusal_text: String,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            template: PromptTemplate::default(),
            refusal_text: DEFAULT_REFUSAL_TEXT.to_string(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_refusal_text(mut self, refusal_text: impl Into<String>) -> Self {
        self.refusal_text = refusal_text.into();
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn refusal_text(&self) -> &str {
        &self.refusal_text
    }

    /// Whether `answer` is the configured refusal.
    pub fn is_refusal(&self, answer: &str) -> bool {
        answer.contains(self.refusal_text.trim())
    }

    /// Answer `question` from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] with [`Stage::Synthesize`] if the
    /// model call fails. There are no retries.
    pub async fn answer(
        &self,
        question: &str,
        context: &[SearchResult],
        history: &ConversationHistory,
    ) -> Result<String> {
        let messages = self.template.render(&self.refusal_text, question, context, history);
        debug!(
            model = self.model.name(),
            passage_count = context.len(),
            message_count = messages.len(),
            "synthesizing answer"
        );

        let answer = self.model.generate(&messages).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer synthesis failed");
            RagError::GenerationError { stage: Stage::Synthesize, message: e.to_string() }
        })?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ragchat_model::{MockLlm, Role};

    use super::*;

    fn passage(text: &str) -> SearchResult {
        SearchResult { id: text.into(), text: text.into(), score: 1.0, metadata: HashMap::new() }
    }

    #[test]
    fn system_message_carries_instructions_refusal_and_context() {
        let messages = PromptTemplate::default().render(
            DEFAULT_REFUSAL_TEXT,
            "月亮",
            &[passage("床前明月光"), passage("长安一片月")],
            &ConversationHistory::new(),
        );

        assert_eq!(messages.len(), 2);
        let system = &messages[0].content;
        assert!(system.contains("专业的问答助手"));
        assert!(system.contains(DEFAULT_REFUSAL_TEXT));
        assert!(system.ends_with("背景资料:\n床前明月光\n\n长安一片月"));
        assert_eq!(messages[1].content, "月亮");
    }

    #[test]
    fn history_slot_can_be_disabled() {
        let history = ConversationHistory::from_pairs([("q", "a")]);
        let with = PromptTemplate::default().render("r", "next", &[], &history);
        let without = PromptTemplate { history_slot: false, ..PromptTemplate::default() }
            .render("r", "next", &[], &history);

        let roles: Vec<Role> = with.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::Human, Role::Assistant, Role::Human]);
        assert_eq!(without.len(), 2);
    }

    #[tokio::test]
    async fn answer_is_trimmed() {
        let llm = Arc::new(MockLlm::new("mock").with_reply("\n  长安一片月。 \n"));
        let synthesizer = AnswerSynthesizer::new(llm);

        let answer =
            synthesizer.answer("月亮", &[passage("长安一片月")], &ConversationHistory::new()).await.unwrap();
        assert_eq!(answer, "长安一片月。");
        assert!(!synthesizer.is_refusal(&answer));
    }

    #[tokio::test]
    async fn model_failure_is_a_synthesis_generation_error() {
        let llm = Arc::new(MockLlm::new("mock").with_failure("quota exceeded"));
        let synthesizer = AnswerSynthesizer::new(llm);

        let err = synthesizer.answer("q", &[], &ConversationHistory::new()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Synthesize));
    }

    #[test]
    fn custom_refusal_text_is_recognised() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(MockLlm::new("mock")))
            .with_refusal_text("I don't know.");
        assert!(synthesizer.is_refusal("I don't know."));
        assert!(!synthesizer.is_refusal(DEFAULT_REFUSAL_TEXT));
    }
}
