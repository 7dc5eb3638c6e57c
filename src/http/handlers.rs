use super::render::{status_fragment, StatusView, FALLBACK_INDEX};
use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use chrono::Utc;
use tracing::{debug, info};

/// GET /
/// htmx shell that polls the status fragment
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::read_to_string(state.index_file.as_path()).await {
        Ok(page) => Html(page),
        Err(e) => {
            debug!(
                "Index file {} unavailable ({}), serving built-in page",
                state.index_file.display(),
                e
            );
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

/// GET /status
/// Render the current connection status
pub async fn get_status(State(state): State<AppState>) -> Html<String> {
    Html(status_fragment(&state.status().snapshot(), Utc::now()))
}

/// POST /connect
/// Start a connection attempt in the background unless one is running or
/// the client is already connected
pub async fn connect(State(state): State<AppState>) -> Html<String> {
    match state.coordinator.spawn_connect() {
        Some(_) => info!("Connection attempt started"),
        None => debug!("Connect ignored: attempt in progress or already connected"),
    }

    get_status(State(state)).await
}

/// POST /disconnect
/// Disconnect the client, then render the resulting status
pub async fn disconnect(State(state): State<AppState>) -> Html<String> {
    state.coordinator.disconnect().await;
    get_status(State(state)).await
}

/// GET /api/status
/// JSON status for scripts and monitors
pub async fn get_status_json(State(state): State<AppState>) -> Json<StatusView> {
    Json(StatusView::new(&state.status().snapshot(), Utc::now()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
