//! Bounded conversation history sent with each suggestion request

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of user/assistant exchanges kept
pub const DEFAULT_MAX_EXCHANGES: usize = 6;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Completed exchanges, oldest first
///
/// Only successful exchanges are recorded. Once the cap is exceeded the
/// oldest user/assistant pair is dropped.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: VecDeque<ChatMessage>,
    max_exchanges: usize,
}

impl ChatHistory {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_exchanges * 2 + 2),
            max_exchanges,
        }
    }

    /// Record one successful exchange
    pub fn record(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push_back(ChatMessage::user(user));
        self.messages.push_back(ChatMessage::assistant(assistant));
        while self.messages.len() > self.max_exchanges * 2 {
            self.messages.pop_front();
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Number of recorded exchanges
    pub fn len(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}
