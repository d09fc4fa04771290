use actix_web::web;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/session", web::post().to(handlers::new_session))
            .route("/chat", web::post().to(handlers::chat))
            .route("/clear", web::post().to(handlers::clear))
            .route("/config", web::get().to(handlers::config_status))
            .route("/config", web::post().to(handlers::update_config))
            .route("/documents", web::get().to(handlers::list_documents))
    )
    .route("/", web::get().to(handlers::index))
    .route("/health", web::get().to(handlers::health_check));
}
