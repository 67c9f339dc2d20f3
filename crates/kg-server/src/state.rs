use std::sync::Arc;

use kg_notify::LogNotifier;
use kg_service::{ServiceConfig, Services};
use kg_store::{InMemoryPhotoStore, InMemoryStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Memory-backed state publishing to the log.
    pub fn in_memory(config: ServiceConfig) -> Self {
        Self::new(Services::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryPhotoStore::new()),
            Arc::new(LogNotifier::new()),
            config,
        ))
    }
}
