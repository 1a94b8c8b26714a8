//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::hub::ConnectionRegistry;
use crate::snapshot::SnapshotBuilder;
use crate::sources::{MediaCache, PlayerControl};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Open dashboard connections
    pub registry: Arc<ConnectionRegistry>,
    /// Snapshot builder shared with the broadcast loop
    pub builder: Arc<SnapshotBuilder>,
    /// Cached media player state
    pub media: MediaCache,
    /// Media player transport control
    pub player: Arc<dyn PlayerControl>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        builder: Arc<SnapshotBuilder>,
        media: MediaCache,
        player: Arc<dyn PlayerControl>,
    ) -> Self {
        Self {
            registry,
            builder,
            media,
            player,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}
