//! Caller-supplied conversation history.

use ragchat_model::Message;
use serde::{Deserialize, Serialize};

/// Who said a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Assistant,
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationTurn {
    pub fn human(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Human, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }

    /// Convert to a model chat message.
    pub fn to_message(&self) -> Message {
        match self.speaker {
            Speaker::Human => Message::human(self.text.clone()),
            Speaker::Assistant => Message::assistant(self.text.clone()),
        }
    }
}

/// An ordered conversation, oldest turn first.
///
/// Histories are provided with every request and never stored by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from `(human, assistant)` exchanges, the shape used by the HTTP API.
    pub fn from_pairs<H, A>(pairs: impl IntoIterator<Item = (H, A)>) -> Self
    where
        H: Into<String>,
        A: Into<String>,
    {
        let turns = pairs
            .into_iter()
            .flat_map(|(human, assistant)| {
                [ConversationTurn::human(human), ConversationTurn::assistant(assistant)]
            })
            .collect();
        Self { turns }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The turns as alternating model messages.
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(ConversationTurn::to_message).collect()
    }
}

impl From<Vec<ConversationTurn>> for ConversationHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}

#[cfg(test)]
mod tests {
    use ragchat_model::Role;

    use super::*;

    #[test]
    fn pairs_expand_to_alternating_turns() {
        let history = ConversationHistory::from_pairs([("这首诗的作者是谁", "李白")]);
        let messages = history.to_messages();

        assert_eq!(history.len(), 2);
        assert_eq!(messages[0].role, Role::Human);
        assert_eq!(messages[0].content, "这首诗的作者是谁");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "李白");
    }

    #[test]
    fn empty_pairs_give_empty_history() {
        let history = ConversationHistory::from_pairs(Vec::<(String, String)>::new());
        assert!(history.is_empty());
    }
}
