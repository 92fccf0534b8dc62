//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use bloodlink_core::config::AppConfig;
use bloodlink_realtime::RoomHub;
use bloodlink_service::MatchingEngine;

/// Passed to every Axum handler via `State<AppState>`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The matching engine.
    pub engine: MatchingEngine,
    /// Local room hub. `None` when a remote gateway serves clients.
    pub hub: Option<Arc<RoomHub>>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Bundle the server's shared dependencies.
    pub fn new(config: AppConfig, engine: MatchingEngine, hub: Option<Arc<RoomHub>>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            hub,
            started_at: Instant::now(),
        }
    }
}
