use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::chat::Message;
use crate::config::Settings;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API key not configured")]
    Auth,

    #[error("{0}")]
    Request(String),

    #[error("Invalid response from API")]
    MalformedResponse,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        CompletionError::Request(e.to_string())
    }
}

/// A hosted chat-completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full message list and return the assistant's text.
    async fn complete(&self, messages: &[Message], api_key: Option<&str>) -> Result<String, CompletionError>;
}

// Client for the OpenAI-compatible Groq chat completions API
pub struct GroqClient {
    api_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    client: Client,
}

impl GroqClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        info!("Using completion endpoint {} with model {}", settings.api_url, settings.model);

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, messages: &[Message], api_key: Option<&str>) -> Result<String, CompletionError> {
        let api_key = api_key.filter(|key| !key.trim().is_empty()).ok_or(CompletionError::Auth)?;

        let payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "top_p": self.top_p,
            "stream": false
        });

        info!("Sending {} messages to completion endpoint", messages.len());
        debug!("Payload: {}", payload);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Prefer the API's own explanation when the body carries one
            let error_body: Value = response.json().await.unwrap_or(Value::Null);
            let message = error_body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("API request failed: {}", status.as_u16()));
            return Err(CompletionError::Request(message));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|_| CompletionError::MalformedResponse)?;
        debug!("Response JSON: {}", response_json);

        let content = response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or(CompletionError::MalformedResponse)?;

        info!("Response length: {} characters", content.len());
        Ok(content.to_string())
    }
}
