//! Scripted language model for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::llm::LanguageModel;
use crate::message::{Message, Role};

type Responder = Box<dyn Fn(&[Message]) -> String + Send + Sync>;

enum Scripted {
    Reply(String),
    Fail(String),
}

/// A [`LanguageModel`] that replays scripted replies and records every call.
///
/// Replies are consumed in order. Once the script is exhausted the model falls
/// back to its responder (if one was set with [`MockLlm::from_fn`]) or echoes
/// the last human message.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_model::{LanguageModel, Message, MockLlm};
///
/// let llm = MockLlm::new("mock").with_reply("李白还写了哪些诗？");
/// let reply = llm.generate(&[Message::human("他还写了什么诗")]).await.unwrap();
/// assert_eq!(reply, "李白还写了哪些诗？");
/// assert_eq!(llm.calls().len(), 1);
/// ```
pub struct MockLlm {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose replies are computed from the request messages.
    pub fn from_fn(
        name: impl Into<String>,
        responder: impl Fn(&[Message]) -> String + Send + Sync + 'static,
    ) -> Self {
        Self { responder: Some(Box::new(responder)), ..Self::new(name) }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.lock_script().push_back(Scripted::Reply(reply.into()));
        self
    }

    /// Queue a failure; the call that consumes it returns [`ModelError::Request`].
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Every message list this model has been called with, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(messages.to_vec());

        let next = self.lock_script().pop_front();
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => {
                Err(ModelError::Request { provider: "mock".into(), message })
            }
            None => match &self.responder {
                Some(responder) => Ok(responder(messages)),
                None => Ok(messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Human)
                    .map(|m| m.content.clone())
                    .unwrap_or_default()),
            },
        }
    }
}
