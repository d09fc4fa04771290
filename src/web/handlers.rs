use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tera::Context;
use log::{info, error, debug};

use crate::chat::prompt::extract_site_name;
use crate::chat::SendOutcome;
use crate::config::ConfigurationProvider;
use crate::web::models::{
    ChatRequest, ChatResponse, ConfigRequest, ConfigStatus, DocumentInfo, EventLog, SessionRequest,
};
use crate::AppState;

fn internal_error(e: &str) -> HttpResponse {
    error!("Failed to lock sessions mutex: {}", e);
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error"
    }))
}

// Index page handler
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let mut context = Context::new();
    context.insert("configured", &data.config.is_configured());
    context.insert("document_count", &data.documents.len());
    match data.tera.render("index.html", &context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            error!("Template error: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Opens a fresh session for a page load and returns its greeting; the
// page's previous session, if any, is dropped with its history
pub async fn new_session(data: web::Data<AppState>, req: web::Json<SessionRequest>) -> impl Responder {
    let (session_id, session) = match data.restart_session(req.session_id) {
        Ok(opened) => opened,
        Err(e) => return internal_error(&e),
    };

    let mut log = EventLog::default();
    session.lock().await.greet(&mut log);
    HttpResponse::Ok().json(ChatResponse { session_id, events: log.events })
}

// Chat API endpoint
pub async fn chat(data: web::Data<AppState>, req: web::Json<ChatRequest>) -> impl Responder {
    let (session_id, session, _) = match data.session(req.session_id) {
        Ok(found) => found,
        Err(e) => return internal_error(&e),
    };

    info!("Chat request from session {}: {} characters", session_id, req.message.len());

    // Holding the session lock for the whole turn keeps one request in flight per session
    let mut log = EventLog::default();
    let outcome = session.lock().await.send(&req.message, &mut log).await;
    match &outcome {
        SendOutcome::Ignored => debug!("Ignored blank message from session {}", session_id),
        SendOutcome::Replied(html) => info!("Replied to session {} ({} bytes of HTML)", session_id, html.len()),
        SendOutcome::Failed(e) => error!("Chat turn failed for session {}: {}", session_id, e),
    }

    HttpResponse::Ok().json(ChatResponse { session_id, events: log.events })
}

// Clears the conversation history of a session
pub async fn clear(data: web::Data<AppState>, req: web::Json<SessionRequest>) -> impl Responder {
    let (session_id, session, _) = match data.session(req.session_id) {
        Ok(found) => found,
        Err(e) => return internal_error(&e),
    };

    let mut log = EventLog::default();
    session.lock().await.clear(&mut log);
    HttpResponse::Ok().json(ChatResponse { session_id, events: log.events })
}

pub async fn config_status(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ConfigStatus { configured: data.config.is_configured() })
}

pub async fn update_config(data: web::Data<AppState>, req: web::Json<ConfigRequest>) -> impl Responder {
    data.config.set_api_key(&req.api_key);
    HttpResponse::Ok().json(ConfigStatus { configured: data.config.is_configured() })
}

pub async fn list_documents(data: web::Data<AppState>) -> impl Responder {
    let documents: Vec<DocumentInfo> = data
        .documents
        .iter()
        .map(|doc| DocumentInfo {
            name: doc.name.clone(),
            site: extract_site_name(&doc.name),
            path: doc.path.clone(),
            url: doc.url.clone(),
            size: doc.size,
        })
        .collect();
    HttpResponse::Ok().json(documents)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{test, App};
    use async_trait::async_trait;
    use tera::Tera;
    use uuid::Uuid;

    use super::*;
    use crate::chat::{Message, MessageRenderer, Role};
    use crate::config::ApiKeyStore;
    use crate::documents::fallback_documents;
    use crate::model::{CompletionClient, CompletionError};
    use crate::sessions::SessionRegistry;
    use crate::web::models::DisplayEvent;
    use crate::web::routes;

    struct Echo;

    #[async_trait]
    impl CompletionClient for Echo {
        async fn complete(&self, messages: &[Message], api_key: Option<&str>) -> Result<String, CompletionError> {
            api_key.ok_or(CompletionError::Auth)?;
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("**{}** ({} messages)", last, messages.len()))
        }
    }

    fn state(key: Option<&str>) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Tera::default(),
            Arc::new(Echo),
            Arc::new(ApiKeyStore::new(key.map(str::to_string))),
            MessageRenderer::default(),
            fallback_documents(),
            SessionRegistry::new(Duration::from_secs(3600), 100),
        ))
    }

    fn assistant_html(events: &[DisplayEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Message { role: Role::Assistant, html } => Some(html.clone()),
                _ => None,
            })
            .collect()
    }

    #[actix_web::test]
    async fn chat_turns_share_a_session() {
        let app = test::init_service(App::new().app_data(state(Some("k"))).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "Bonjour" }))
            .to_request();
        let first: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first.events.len(), 4);
        assert_eq!(assistant_html(&first.events), vec!["<strong>Bonjour</strong> (2 messages)"]);

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "Encore", "session_id": first.session_id }))
            .to_request();
        let second: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(assistant_html(&second.events), vec!["<strong>Encore</strong> (4 messages)"]);
    }

    #[actix_web::test]
    async fn clear_starts_history_over() {
        let app = test::init_service(App::new().app_data(state(Some("k"))).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "un" }))
            .to_request();
        let first: ChatResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/clear")
            .set_json(json!({ "session_id": first.session_id }))
            .to_request();
        let cleared: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(assistant_html(&cleared.events), vec!["Conversation effacée. Comment puis-je vous aider ?"]);

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "deux", "session_id": first.session_id }))
            .to_request();
        let after: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(assistant_html(&after.events), vec!["<strong>deux</strong> (2 messages)"]);
    }

    #[actix_web::test]
    async fn unconfigured_session_is_greeted_and_then_configured() {
        let app = test::init_service(App::new().app_data(state(None)).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/session")
            .set_json(json!({ "session_id": null }))
            .to_request();
        let greeting: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            assistant_html(&greeting.events),
            vec!["Veuillez configurer votre clé API Groq en cliquant sur le bouton ⚙️ en bas à droite."]
        );

        let req = test::TestRequest::post()
            .uri("/api/config")
            .set_json(json!({ "api_key": "gsk_new" }))
            .to_request();
        let status: ConfigStatus = test::call_and_read_body_json(&app, req).await;
        assert!(status.configured);

        let req = test::TestRequest::get().uri("/api/config").to_request();
        let status: ConfigStatus = test::call_and_read_body_json(&app, req).await;
        assert!(status.configured);
    }

    #[actix_web::test]
    async fn page_load_starts_with_empty_history() {
        let app = test::init_service(App::new().app_data(state(Some("k"))).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "un" }))
            .to_request();
        let first: ChatResponse = test::call_and_read_body_json(&app, req).await;

        // the page reloads and announces the id it had before
        let req = test::TestRequest::post()
            .uri("/api/session")
            .set_json(json!({ "session_id": first.session_id }))
            .to_request();
        let reloaded: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_ne!(reloaded.session_id, first.session_id);
        assert!(reloaded.events.is_empty());

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "deux", "session_id": reloaded.session_id }))
            .to_request();
        let after: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(after.session_id, reloaded.session_id);
        assert_eq!(assistant_html(&after.events), vec!["<strong>deux</strong> (2 messages)"]);

        // the dropped session is not reachable any more
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "trois", "session_id": first.session_id }))
            .to_request();
        let stale: ChatResponse = test::call_and_read_body_json(&app, req).await;
        assert_ne!(stale.session_id, first.session_id);
        assert_eq!(assistant_html(&stale.events), vec!["<strong>trois</strong> (2 messages)"]);
    }

    #[actix_web::test]
    async fn client_chosen_ids_are_not_adopted() {
        let data = state(Some("k"));
        let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

        let invented = Uuid::new_v4();
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "un", "session_id": invented }))
            .to_request();
        let reply: ChatResponse = test::call_and_read_body_json(&app, req).await;

        assert_ne!(reply.session_id, invented);
        assert_eq!(data.sessions.len(), 1);
    }

    #[actix_web::test]
    async fn unconfigured_chat_does_not_echo_the_message() {
        let app = test::init_service(App::new().app_data(state(None)).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "message": "question" }))
            .to_request();
        let reply: ChatResponse = test::call_and_read_body_json(&app, req).await;

        assert!(!reply
            .events
            .iter()
            .any(|event| matches!(event, DisplayEvent::Message { role: Role::User, .. })));
        assert_eq!(assistant_html(&reply.events).len(), 1);
    }

    #[actix_web::test]
    async fn documents_are_listed_with_site_names() {
        let app = test::init_service(App::new().app_data(state(None)).configure(routes::configure)).await;

        let req = test::TestRequest::get().uri("/api/documents").to_request();
        let documents: Vec<DocumentInfo> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(documents.len(), 15);
        assert_eq!(documents[8].site, "S1 Panagias");
    }
}
