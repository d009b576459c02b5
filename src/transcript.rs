use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One chat bubble. `content` is markup whose dynamic parts are already escaped.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Ordered chat history plus the typing indicators of in-flight queries.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    typing: Vec<u64>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drop every message. Indicators of queries still in flight stay so their
    /// completion can remove them.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn show_typing(&mut self, request_id: u64) {
        if !self.typing.contains(&request_id) {
            self.typing.push(request_id);
        }
    }

    /// Returns whether an indicator was actually removed.
    pub fn remove_typing(&mut self, request_id: u64) -> bool {
        let before = self.typing.len();
        self.typing.retain(|id| *id != request_id);
        self.typing.len() != before
    }

    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }
}
