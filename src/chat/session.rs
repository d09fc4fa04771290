use std::sync::Arc;

use log::{error, info, warn};
use thiserror::Error;

use super::render::{escape_html, MessageRenderer};
use super::store::{ConversationStore, Role};
use crate::config::ConfigurationProvider;
use crate::model::{CompletionClient, CompletionError};

pub const CONFIGURE_NOTICE: &str =
    "Veuillez configurer votre clé API Groq en cliquant sur le bouton ⚙️ en bas à droite.";
pub const CLEARED_NOTICE: &str = "Conversation effacée. Comment puis-je vous aider ?";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key not configured")]
    ConfigurationMissing,

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Display side of a chat session. Messages arrive already rendered.
pub trait Presenter {
    fn show_message(&mut self, role: Role, html: &str);
    fn show_typing(&mut self);
    fn hide_typing(&mut self);
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The rendered assistant reply.
    Replied(String),
    /// The failure has already been shown to the user.
    Failed(ChatError),
}

/// One user's conversation: history, rendering and the completion call.
pub struct ChatSession {
    store: ConversationStore,
    renderer: MessageRenderer,
    system_prompt: Arc<str>,
    client: Arc<dyn CompletionClient>,
    config: Arc<dyn ConfigurationProvider>,
}

impl ChatSession {
    pub fn new(
        system_prompt: Arc<str>,
        renderer: MessageRenderer,
        client: Arc<dyn CompletionClient>,
        config: Arc<dyn ConfigurationProvider>,
    ) -> Self {
        Self {
            store: ConversationStore::new(),
            renderer,
            system_prompt,
            client,
            config,
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &[super::store::Message] {
        self.store.messages()
    }

    /// Opening message for a fresh session, if one is needed.
    pub fn greet(&self, presenter: &mut impl Presenter) {
        if !self.config.is_configured() {
            presenter.show_message(Role::Assistant, &self.renderer.render(CONFIGURE_NOTICE));
        }
    }

    /// Send one user message and wait for the reply.
    ///
    /// Failures are reported to the presenter as an assistant bubble and are
    /// kept out of the history sent back to the model.
    pub async fn send(&mut self, text: &str, presenter: &mut impl Presenter) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        if !self.config.is_configured() {
            warn!("Message rejected: API key not configured");
            presenter.show_message(Role::Assistant, &self.renderer.render(CONFIGURE_NOTICE));
            return SendOutcome::Failed(ChatError::ConfigurationMissing);
        }

        presenter.show_message(Role::User, &escape_html(text));
        self.store.append_user(text);

        presenter.show_typing();
        let messages = self.store.build_request_messages(&self.system_prompt);
        info!("Sending turn {} ({} characters)", self.store.len(), text.len());

        let api_key = self.config.api_key();
        let result = self.client.complete(&messages, api_key.as_deref()).await;
        presenter.hide_typing();

        match result {
            Ok(reply) => {
                self.store.append_assistant(&reply);
                let html = self.renderer.render(&reply);
                presenter.show_message(Role::Assistant, &html);
                SendOutcome::Replied(html)
            }
            Err(e) => {
                error!("Error processing message: {}", e);
                let notice = format!(
                    "Erreur : {}. Veuillez vérifier la configuration de votre clé API et réessayer.",
                    e
                );
                presenter.show_message(Role::Assistant, &self.renderer.render(&notice));
                SendOutcome::Failed(e.into())
            }
        }
    }

    pub fn clear(&mut self, presenter: &mut impl Presenter) {
        self.store.clear();
        info!("Conversation cleared");
        presenter.show_message(Role::Assistant, &self.renderer.render(CLEARED_NOTICE));
    }
}
