//! Snapshot Builder
//!
//! Pulls current readings from the source adapters and composes one
//! immutable [`Snapshot`]. Never touches the connection registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{SnapshotError, SnapshotResult};
use super::types::{CarStatus, MusicStatus, Snapshot};
use crate::sources::{DiagnosticsSource, MediaCache, Metric};

/// Composes snapshots from the diagnostics adapter and the media cache
pub struct SnapshotBuilder {
    diagnostics: Arc<dyn DiagnosticsSource>,
    media: MediaCache,
    /// Upper bound on one diagnostics batch
    timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(diagnostics: Arc<dyn DiagnosticsSource>, media: MediaCache, timeout: Duration) -> Self {
        Self {
            diagnostics,
            media,
            timeout,
        }
    }

    /// Build a snapshot from current source state
    ///
    /// Fails if the diagnostics batch fails or times out; the vehicle panel
    /// is all-or-nothing.
    pub async fn build(&self) -> SnapshotResult<Snapshot> {
        let music = self.music_status();
        let car = self.car_status().await?;
        Ok(Snapshot::new(Some(music), Some(car)))
    }

    /// Run one diagnostics batch for every dashboard metric
    pub async fn car_status(&self) -> SnapshotResult<CarStatus> {
        let readings = tokio::time::timeout(
            self.timeout,
            self.diagnostics.query_batch(&Metric::ALL),
        )
        .await
        .map_err(|_| SnapshotError::Timeout(self.timeout))??;

        Ok(CarStatus::from_readings(&readings)?)
    }

    /// Freshest cached player state; empty if no player is known
    pub fn music_status(&self) -> MusicStatus {
        self.media
            .latest()
            .map(|info| MusicStatus::from_player(&info, Instant::now()))
            .unwrap_or_default()
    }

    /// Name of the diagnostics adapter in use
    pub fn diagnostics_name(&self) -> &str {
        self.diagnostics.name()
    }
}
