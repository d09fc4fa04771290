use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

/// One turn of the conversation, serialized exactly as the completion
/// endpoint expects it (`{"role": ..., "content": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Ordered turn history of a single chat session.
///
/// The system prompt is not part of the history; it is prepended each time
/// the request payload is assembled.
#[derive(Debug, Default)]
pub struct ConversationStore {
    history: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whitespace-only text is ignored.
    pub fn append_user(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.history.push(Message::user(text));
    }

    pub fn append_assistant(&mut self, text: &str) {
        self.history.push(Message::assistant(text));
    }

    /// Returns `[system, ...history]` as a fresh vector; callers may do what
    /// they like with it without touching the stored turns.
    pub fn build_request_messages(&self, system_prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend(self.history.iter().cloned());
        messages
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
