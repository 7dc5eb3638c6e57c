use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Status page
        .route("/", get(handlers::index))
        .route("/status", get(handlers::get_status))
        .route("/api/status", get(handlers::get_status_json))
        // Connection control
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
