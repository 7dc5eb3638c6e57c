//! HTTP surface for the status page (htmx)
//!
//! This module serves the pairing/status UI and connection controls:
//! - GET / - Status page shell
//! - GET /status - Status fragment (label, uptime, QR code, actions)
//! - GET /api/status - Status as JSON
//! - POST /connect - Start a connection attempt
//! - POST /disconnect - Disconnect the client
//! - GET /health - Health check

mod handlers;
mod render;
mod routes;
mod state;

pub use render::{status_fragment, StatusView};
pub use routes::create_router;
pub use state::AppState;
