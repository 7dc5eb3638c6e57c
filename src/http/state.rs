use crate::session::{ConnectionCoordinator, StatusStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Connection lifecycle; handlers only read status, claim a connect, or disconnect
    pub coordinator: ConnectionCoordinator,

    /// htmx page served at `/`
    pub index_file: Arc<PathBuf>,
}

impl AppState {
    pub fn new(coordinator: ConnectionCoordinator, index_file: impl Into<PathBuf>) -> Self {
        Self {
            coordinator,
            index_file: Arc::new(index_file.into()),
        }
    }

    pub fn status(&self) -> &StatusStore {
        self.coordinator.status()
    }
}
