//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Full health status. Degraded while the vehicle bus is not answering;
/// dashboards keep streaming either way.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let diagnostics_ok = state.builder.car_status().await.is_ok();

    Json(HealthResponse {
        status: if diagnostics_ok { "healthy" } else { "degraded" }.to_string(),
        diagnostics: state.builder.diagnostics_name().to_string(),
        media_connected: state.media.is_connected(),
        connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
