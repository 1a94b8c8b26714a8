//! Snapshot Routes
//!
//! - GET /api/fullproto - Current snapshot, text encoded
//! - GET /api/obdtest - One diagnostics batch, for bench testing the adapter

use axum::{extract::State, http::header, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::snapshot::{encode_text, CarStatus};

/// GET /api/fullproto
///
/// Builds a fresh snapshot and returns it as plain text.
pub async fn full_snapshot(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let snapshot = state.builder.build().await?;
    let text = encode_text(&snapshot)?;

    tracing::trace!(bytes = text.len(), "Serving full snapshot");
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

/// GET /api/obdtest
pub async fn diagnostics_test(State(state): State<Arc<AppState>>) -> ApiResult<Json<CarStatus>> {
    let status = state.builder.car_status().await?;
    Ok(Json(status))
}
