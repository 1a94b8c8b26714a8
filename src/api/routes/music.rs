//! Music Routes
//!
//! - GET /api/musicconnected - Whether a media player is known
//! - GET /api/music/:command - play, pause, toggle, next, previous, stop
//! - GET /api/music/seek/:seconds - Seek within the current track

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CommandResponse, MusicConnectedResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::sources::PlayerCommand;

/// GET /api/musicconnected
pub async fn music_connected(State(state): State<Arc<AppState>>) -> Json<MusicConnectedResponse> {
    let latest = state.media.latest();
    Json(MusicConnectedResponse {
        connected: latest.is_some(),
        player_name: latest.map(|info| info.player_name),
    })
}

/// GET /api/music/:command
pub async fn music_command(
    State(state): State<Arc<AppState>>,
    Path(command): Path<String>,
) -> ApiResult<Json<CommandResponse>> {
    if command == "seek" {
        return Err(ApiError::BadRequest(
            "Time in seconds required to seek".to_string(),
        ));
    }

    let parsed = PlayerCommand::parse(&command).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid argument supplied to music API: {}", command))
    })?;

    execute(&state, parsed, command).await
}

/// GET /api/music/seek/:seconds
pub async fn music_seek(
    State(state): State<Arc<AppState>>,
    Path(seconds): Path<String>,
) -> ApiResult<Json<CommandResponse>> {
    let parsed = PlayerCommand::seek(&seconds).ok_or_else(|| {
        ApiError::BadRequest(format!("Seek time must be whole seconds, got {}", seconds))
    })?;

    execute(&state, parsed, format!("seek {}", seconds)).await
}

async fn execute(
    state: &AppState,
    command: PlayerCommand,
    label: String,
) -> ApiResult<Json<CommandResponse>> {
    state.player.execute(command).await?;
    tracing::debug!(command = %label, "Music command executed");

    Ok(Json(CommandResponse {
        status: "ok".to_string(),
        command: label,
    }))
}
