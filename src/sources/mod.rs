//! Source Adapters
//!
//! The three independent data sources feeding the dashboard:
//! - Diagnostics bus (engine and fuel readings)
//! - Media player (now playing, playback control)
//! - Camera (device probe)
//!
//! Each source sits behind a trait so the hub never depends on a particular
//! device driver. The crate ships simulated implementations for bench and
//! demo use; real drivers plug in through the same traits.

pub mod camera;
pub mod diagnostics;
pub mod media;

pub use camera::{probe_camera, CameraInfo, CameraSource, DeviceCamera};
pub use diagnostics::{
    DiagnosticsSource, Metric, OfflineDiagnostics, Reading, SimulatedDiagnostics,
};
pub use media::{
    MediaCache, MediaSubscription, NullPlayer, PlaybackStatus, PlayerCommand, PlayerControl,
    PlayerFeed, PlayerInfo, SimulatedPlayer,
};

use thiserror::Error;

/// Errors reported by a source adapter
///
/// All of these are recoverable: the broadcast loop simply tries again on
/// the next tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Device could not be opened or is not connected
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// A single metric query failed
    #[error("Query for {metric} failed: {message}")]
    Query { metric: Metric, message: String },

    /// The adapter answered a batch without a reading for this metric
    #[error("No reading returned for {0}")]
    MissingReading(Metric),

    /// The adapter answered a batch with two readings for the same metric
    #[error("Duplicate reading for {0}")]
    DuplicateReading(Metric),

    /// The adapter returned a reading that was not asked for
    #[error("Unexpected reading for {got} (requested {requested})")]
    UnexpectedReading { requested: Metric, got: Metric },

    /// Operation not supported by this adapter
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;
