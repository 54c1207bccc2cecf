//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room registry, the pending WS tickets, and the history
//! store. Each room owns its members and their outbound channels.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::services::history::{HistoryStore, MemoryHistory};
use crate::services::room::RoomRegistry;
use crate::services::session::SessionStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub rooms: RoomRegistry,
    pub sessions: SessionStore,
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let history = Arc::new(MemoryHistory::new(config.history_limit));
        Self::with_history(config, history)
    }

    #[must_use]
    pub fn with_history(config: ServerConfig, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            config,
            rooms: RoomRegistry::new(),
            sessions: SessionStore::new(Duration::from_secs(config.ticket_ttl_secs)),
            history,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
