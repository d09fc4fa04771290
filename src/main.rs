mod chat;
mod config;
mod documents;
mod model;
mod sessions;
mod web;

use actix_web::{App, HttpServer, web::Data};
use actix_files as fs;
use dotenv::dotenv;
use log::{info, error};
use std::sync::Arc;
use std::time::Duration;
use tera::Tera;
use uuid::Uuid;

use chat::prompt::{build_system_prompt, document_summary};
use chat::{ChatSession, MessageRenderer};
use config::{ApiKeyStore, Settings};
use documents::{DocumentCatalog, DocumentDescriptor, GithubCatalog, StaticCatalog};
use model::{CompletionClient, GroqClient};
use sessions::{SessionRegistry, Shared};
use web::routes;

type SharedSession = Shared<ChatSession>;

// App state structure
pub struct AppState {
    tera: Tera,
    client: Arc<dyn CompletionClient>,
    config: Arc<ApiKeyStore>,
    renderer: MessageRenderer,
    system_prompt: Arc<str>,
    documents: Vec<DocumentDescriptor>,
    sessions: SessionRegistry<ChatSession>,
}

impl AppState {
    pub fn new(
        tera: Tera,
        client: Arc<dyn CompletionClient>,
        config: Arc<ApiKeyStore>,
        renderer: MessageRenderer,
        documents: Vec<DocumentDescriptor>,
        sessions: SessionRegistry<ChatSession>,
    ) -> Self {
        let system_prompt: Arc<str> = Arc::from(build_system_prompt(&documents));
        Self {
            tera,
            client,
            config,
            renderer,
            system_prompt,
            documents,
            sessions,
        }
    }

    /// Look up a session, opening a new one when the id is absent, unknown
    /// or expired. New sessions always get a server-issued id; the flag tells
    /// whether the session was just created.
    fn session(&self, id: Option<Uuid>) -> Result<(Uuid, SharedSession, bool), String> {
        if let Some(id) = id {
            if let Some(session) = self.sessions.get(id)? {
                return Ok((id, session, false));
            }
        }
        let (id, session) = self.open_session()?;
        Ok((id, session, true))
    }

    /// Drop the page's previous session, if any, and open a fresh one.
    fn restart_session(&self, previous: Option<Uuid>) -> Result<(Uuid, SharedSession), String> {
        if let Some(previous) = previous {
            if self.sessions.remove(previous)? {
                info!("Closed chat session {}", previous);
            }
        }
        self.open_session()
    }

    fn open_session(&self) -> Result<(Uuid, SharedSession), String> {
        let (id, session) = self.sessions.insert(ChatSession::new(
            self.system_prompt.clone(),
            self.renderer.clone(),
            self.client.clone(),
            self.config.clone(),
        ))?;
        info!("Created chat session {} ({} active)", id, self.sessions.len());
        Ok((id, session))
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Egis chat application");

    let settings = Settings::from_env();
    if settings.api_key.is_none() {
        info!("No GROQ_API_KEY set; waiting for one from the settings panel");
    }

    let client: Arc<dyn CompletionClient> = match GroqClient::new(&settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to initialize completion client: {}", e);
            std::process::exit(1);
        }
    };

    // Load documents first; the system prompt lists them
    let catalog: Box<dyn DocumentCatalog> = if settings.documents_api_url.trim().is_empty() {
        Box::new(StaticCatalog)
    } else {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        match GithubCatalog::new(settings.documents_api_url.clone(), timeout) {
            Ok(catalog) => Box::new(catalog),
            Err(e) => {
                error!("Failed to initialize document listing client: {}", e);
                Box::new(StaticCatalog)
            }
        }
    };
    let documents = catalog.documents().await;
    if !documents.is_empty() {
        info!("Documents loaded: {}", document_summary(&documents));
    }

    // Initialize template engine
    let mut tera = match Tera::new("templates/**/*") {
        Ok(t) => t,
        Err(e) => {
            error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    tera.autoescape_on(vec![".html"]);

    let app_state = Data::new(AppState::new(
        tera,
        client,
        Arc::new(ApiKeyStore::new(settings.api_key.clone())),
        MessageRenderer::new(&settings.bullet_icon_src),
        documents,
        SessionRegistry::new(Duration::from_secs(settings.session_idle_secs), settings.max_sessions),
    ));
    info!("System prompt updated with {} documents", app_state.documents.len());

    // Start web server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/static", "./static"))
    })
    .bind((settings.bind_host.as_str(), settings.bind_port))?
    .run()
    .await
}
