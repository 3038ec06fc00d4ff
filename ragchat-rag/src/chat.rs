//! Conversational RAG orchestration.
//!
//! A chat request moves through fixed stages:
//!
//! ```text
//! RECEIVED → REWRITTEN → RETRIEVED → ANSWERED → DONE
//!     └──────────┴───────────┴──────────┴──────→ FAILED
//! ```
//!
//! The standalone question produced by the rewriter is what the retriever
//! searches with; the synthesizer sees the user's original question plus the
//! history, which carries the referents. A failure at any stage ends the
//! request with the originating error and no partial answer.

use std::fmt;
use std::sync::Arc;

use ragchat_model::LanguageModel;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::history::ConversationHistory;
use crate::retriever::Retriever;
use crate::rewriter::{LlmQueryRewriter, QueryRewriter};
use crate::synthesizer::AnswerSynthesizer;

/// Request body of the chat endpoint.
///
/// `chat_history` is a list of `[human, ai]` pairs, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<(String, String)>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), chat_history: Vec::new() }
    }

    pub fn with_turn(mut self, human: impl Into<String>, ai: impl Into<String>) -> Self {
        self.chat_history.push((human.into(), ai.into()));
        self
    }

    pub fn history(&self) -> ConversationHistory {
        ConversationHistory::from_pairs(self.chat_history.iter().map(|(h, a)| (h.as_str(), a.as_str())))
    }
}

/// Response body of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Everything a completed request produced, for callers that want more than the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub answer: String,
    pub standalone_question: String,
    pub passages: Vec<SearchResult>,
}

/// Lifecycle of a single chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStage {
    Received,
    Rewritten,
    Retrieved,
    Answered,
    Done,
    Failed,
}

impl fmt::Display for ChatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatStage::Received => "RECEIVED",
            ChatStage::Rewritten => "REWRITTEN",
            ChatStage::Retrieved => "RETRIEVED",
            ChatStage::Answered => "ANSWERED",
            ChatStage::Done => "DONE",
            ChatStage::Failed => "FAILED",
        })
    }
}

/// The conversational RAG engine: rewrite → retrieve → synthesize.
///
/// Built once at startup and shared behind an `Arc`. It holds no per-request
/// state, so concurrent requests need no locking.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{ChatRequest, ConversationalRag, VectorRetriever};
///
/// let rag = ConversationalRag::builder()
///     .language_model(llm)
///     .retriever(Arc::new(VectorRetriever::new(embedder, store, "my_rag_collection_manual")))
///     .build()?;
///
/// let request = ChatRequest::new("他还写了什么诗").with_turn("这首诗的作者是谁", "李白");
/// let response = rag.chat(&request).await?;
/// ```
pub struct ConversationalRag {
    rewriter: Arc<dyn QueryRewriter>,
    retriever: Arc<dyn Retriever>,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl ConversationalRag {
    pub fn builder() -> ConversationalRagBuilder {
        ConversationalRagBuilder::default()
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }

    /// Answer a request from the HTTP boundary.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let outcome = self.run(&request.history(), &request.question).await?;
        Ok(ChatResponse { answer: outcome.answer })
    }

    /// Answer a single question with no history.
    pub async fn ask(&self, question: &str) -> Result<String> {
        Ok(self.run(&ConversationHistory::new(), question).await?.answer)
    }

    /// Run one request through every stage.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidRequest`] if `question` is blank
    /// - [`RagError::GenerationError`] from rewriting or synthesis
    /// - [`RagError::RetrievalError`] from retrieval
    pub async fn run(&self, history: &ConversationHistory, question: &str) -> Result<ChatOutcome> {
        let request_id = Uuid::new_v4();
        info!(%request_id, stage = %ChatStage::Received, history_turns = history.len(), "chat request");

        let result = self.run_stages(request_id, history, question).await;
        match &result {
            Ok(_) => info!(%request_id, stage = %ChatStage::Done, "chat request completed"),
            Err(e) => error!(
                %request_id,
                stage = %ChatStage::Failed,
                failed_stage = ?e.stage(),
                error = %e,
                "chat request failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        history: &ConversationHistory,
        question: &str,
    ) -> Result<ChatOutcome> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidRequest("question must not be empty".to_string()));
        }

        let standalone_question = self.rewriter.rewrite(history, question).await?;
        info!(%request_id, stage = %ChatStage::Rewritten, standalone_question = %standalone_question, "question rewritten");

        let passages = self.retriever.retrieve(&standalone_question, self.top_k).await?;
        info!(%request_id, stage = %ChatStage::Retrieved, result_count = passages.len(), "passages retrieved");

        let answer = self.synthesizer.answer(question, &passages, history).await?;
        info!(
            %request_id,
            stage = %ChatStage::Answered,
            refused = self.synthesizer.is_refusal(&answer),
            "answer generated"
        );

        Ok(ChatOutcome { answer, standalone_question, passages })
    }
}

/// Builder for [`ConversationalRag`].
///
/// A retriever is required. The rewriter and synthesizer can be given
/// explicitly or derived from a single model via
/// [`language_model`](Self::language_model).
#[derive(Default)]
pub struct ConversationalRagBuilder {
    rewriter: Option<Arc<dyn QueryRewriter>>,
    retriever: Option<Arc<dyn Retriever>>,
    synthesizer: Option<AnswerSynthesizer>,
    language_model: Option<Arc<dyn LanguageModel>>,
    top_k: Option<usize>,
}

impl ConversationalRagBuilder {
    /// Use one model for both rewriting and answering, with default prompts.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    pub fn rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn synthesizer(mut self, synthesizer: AnswerSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Number of passages to retrieve. Defaults to the [`RagConfig`] default.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Take `top_k` from a config.
    pub fn config(self, config: &RagConfig) -> Self {
        self.top_k(config.top_k)
    }

    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the retriever is missing, if
    /// neither a rewriter/synthesizer nor a language model was given, or if
    /// `top_k` is zero.
    pub fn build(self) -> Result<ConversationalRag> {
        let retriever =
            self.retriever.ok_or_else(|| RagError::ConfigError("retriever is required".to_string()))?;

        let rewriter: Arc<dyn QueryRewriter> = match (self.rewriter, &self.language_model) {
            (Some(rewriter), _) => rewriter,
            (None, Some(model)) => Arc::new(LlmQueryRewriter::new(model.clone())),
            (None, None) => {
                return Err(RagError::ConfigError(
                    "rewriter or language_model is required".to_string(),
                ));
            }
        };
        let synthesizer = match (self.synthesizer, self.language_model) {
            (Some(synthesizer), _) => synthesizer,
            (None, Some(model)) => AnswerSynthesizer::new(model),
            (None, None) => {
                return Err(RagError::ConfigError(
                    "synthesizer or language_model is required".to_string(),
                ));
            }
        };

        let top_k = self.top_k.unwrap_or(RagConfig::default().top_k);
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }

        Ok(ConversationalRag { rewriter, retriever, synthesizer, top_k })
    }
}

#[cfg(test)]
mod tests {
    use ragchat_model::MockLlm;

    use super::*;

    struct NoHits;

    #[async_trait::async_trait]
    impl Retriever for NoHits {
        async fn retrieve(&self, _question: &str, _k: usize) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn chat_request_accepts_pair_arrays() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"question": "他还写了什么诗", "chat_history": [["这首诗的作者是谁", "李白"]]}"#,
        )
        .unwrap();
        assert_eq!(request, ChatRequest::new("他还写了什么诗").with_turn("这首诗的作者是谁", "李白"));
        assert_eq!(request.history().len(), 2);
    }

    #[test]
    fn chat_history_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str(r#"{"question": "月亮"}"#).unwrap();
        assert!(request.chat_history.is_empty());
    }

    #[test]
    fn builder_requires_retriever_and_model() {
        let missing_retriever =
            ConversationalRag::builder().language_model(Arc::new(MockLlm::new("mock"))).build();
        assert!(matches!(missing_retriever, Err(RagError::ConfigError(_))));

        let missing_model = ConversationalRag::builder().retriever(Arc::new(NoHits)).build();
        assert!(matches!(missing_model, Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_any_model_call() {
        let llm = Arc::new(MockLlm::new("mock"));
        let rag = ConversationalRag::builder()
            .language_model(llm.clone())
            .retriever(Arc::new(NoHits))
            .build()
            .unwrap();

        assert!(matches!(rag.ask("   ").await, Err(RagError::InvalidRequest(_))));
        assert!(llm.calls().is_empty());
    }

    #[test]
    fn stages_display_in_upper_case() {
        assert_eq!(ChatStage::Rewritten.to_string(), "REWRITTEN");
        assert_eq!(ChatStage::Failed.to_string(), "FAILED");
    }
}
