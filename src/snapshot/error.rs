//! Snapshot error types

use std::time::Duration;
use thiserror::Error;

use crate::sources::SourceError;

/// Errors that can occur while building or encoding a snapshot
///
/// None of these are fatal; the tick that hit one is skipped.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// A source adapter failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Diagnostics did not answer within the per-tick budget
    #[error("Diagnostics timed out after {0:?}")]
    Timeout(Duration),

    /// Encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for SnapshotError {
    fn from(err: bincode::Error) -> Self {
        SnapshotError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err.to_string())
    }
}

/// Result type alias for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
