use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{Presenter, Role};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: Option<Uuid>,
}

/// What the page has to paint, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEvent {
    Message { role: Role, html: String },
    Typing,
    TypingDone,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub events: Vec<DisplayEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub site: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Presenter that records display events for the HTTP response.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<DisplayEvent>,
}

impl Presenter for EventLog {
    fn show_message(&mut self, role: Role, html: &str) {
        self.events.push(DisplayEvent::Message {
            role,
            html: html.to_string(),
        });
    }

    fn show_typing(&mut self) {
        self.events.push(DisplayEvent::Typing);
    }

    fn hide_typing(&mut self) {
        self.events.push(DisplayEvent::TypingDone);
    }
}
