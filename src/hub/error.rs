//! Connection hub error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur on a single dashboard connection
///
/// A connection error only ever affects the connection it happened on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    /// The hub is draining and takes no new connections
    #[error("Server shutting down")]
    ShuttingDown,

    /// The connection's writer has stopped; nothing more can be sent
    #[error("Connection closed")]
    ConnectionClosed,

    /// The client is not keeping up with the broadcast rate
    #[error("Outbound queue full ({0} frames)")]
    QueueFull(usize),

    /// A single frame took longer than the write timeout
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// Reading from or writing to the transport failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<axum::Error> for HubError {
    fn from(err: axum::Error) -> Self {
        HubError::Transport(err.to_string())
    }
}
