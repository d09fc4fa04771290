use std::env;
use std::str::FromStr;
use std::sync::RwLock;

use log::{info, warn};

use crate::chat::render::DEFAULT_BULLET_ICON_SRC;
use crate::documents::DEFAULT_DOCUMENTS_API_URL;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Runtime settings, read from the environment (and `.env`) at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
    pub request_timeout_secs: u64,
    /// Idle time after which a chat session is dropped; 0 keeps sessions
    /// until they are evicted for space.
    pub session_idle_secs: u64,
    pub max_sessions: usize,
    /// Empty disables the live listing and serves the built-in list.
    pub documents_api_url: String,
    pub bullet_icon_src: String,
    pub bind_host: String,
    pub bind_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 8192,
            request_timeout_secs: 120,
            session_idle_secs: 3600,
            max_sessions: 1000,
            documents_api_url: DEFAULT_DOCUMENTS_API_URL.to_string(),
            bullet_icon_src: DEFAULT_BULLET_ICON_SRC.to_string(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8080,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env::var("GROQ_API_KEY").ok().filter(|key| !key.trim().is_empty()),
            api_url: env::var("GROQ_API_URL").unwrap_or(defaults.api_url),
            model: env::var("GROQ_MODEL").unwrap_or(defaults.model),
            temperature: parsed_var("TEMPERATURE", defaults.temperature),
            top_p: parsed_var("TOP_P", defaults.top_p),
            max_tokens: parsed_var("MAX_TOKENS", defaults.max_tokens),
            request_timeout_secs: parsed_var("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            session_idle_secs: parsed_var("SESSION_IDLE_SECS", defaults.session_idle_secs),
            max_sessions: parsed_var("MAX_SESSIONS", defaults.max_sessions),
            documents_api_url: env::var("DOCUMENTS_API_URL").unwrap_or(defaults.documents_api_url),
            bullet_icon_src: env::var("BULLET_ICON_SRC").unwrap_or(defaults.bullet_icon_src),
            bind_host: env::var("BIND_HOST").unwrap_or(defaults.bind_host),
            bind_port: parsed_var("BIND_PORT", defaults.bind_port),
        }
    }
}

/// Where the chat looks up the API credential.
pub trait ConfigurationProvider: Send + Sync {
    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<String>;
}

/// Credential held in memory for the lifetime of the process; seeded from
/// the environment and replaceable from the settings endpoint.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    key: RwLock<Option<String>>,
}

impl ApiKeyStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            key: RwLock::new(initial),
        }
    }

    /// Blank input removes the key.
    pub fn set_api_key(&self, key: &str) {
        let key = key.trim();
        let value = if key.is_empty() { None } else { Some(key.to_string()) };
        info!("API key {}", if value.is_some() { "updated" } else { "removed" });
        match self.key.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl ConfigurationProvider for ApiKeyStore {
    fn api_key(&self) -> Option<String> {
        match self.key.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
