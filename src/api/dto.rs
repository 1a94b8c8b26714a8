//! Data Transfer Objects
//!
//! Response types for the JSON endpoints.

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Diagnostics adapter in use
    pub diagnostics: String,
    /// Whether a media player is known
    pub media_connected: bool,
    /// Open dashboard connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}

/// `/api/musicconnected` response
#[derive(Debug, Serialize, Deserialize)]
pub struct MusicConnectedResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}

/// Music command acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Status: "ok"
    pub status: String,
    /// Command that was applied
    pub command: String,
}
