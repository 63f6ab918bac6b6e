//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Definition table
        .route(
            "/api/definitions",
            get(api::list_definitions)
                .post(api::add_definition)
                .put(api::replace_definitions),
        )
        .route("/api/definitions/generate", post(api::generate_definitions))
        .route(
            "/api/definitions/{index}",
            put(api::update_definition).delete(api::remove_definition),
        )
        // Dumps
        .route("/api/dumps", get(api::list_dumps).post(api::add_dump))
        .route(
            "/api/dumps/{id}",
            get(api::get_dump)
                .put(api::update_dump)
                .delete(api::remove_dump),
        )
        // Comparison
        .route("/api/compare", post(api::compare))
        .route("/api/config", get(api::get_config))
        .route("/api/save", post(api::save))
        // WebSocket for change notifications
        .route("/ws", get(ws::websocket_handler))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server until it fails or the process is stopped
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
