//! Dashlink HTTP API
//!
//! HTTP layer for the dashboard hub, built with Axum.
//!
//! # Endpoints
//!
//! ## Streaming
//! - `GET /api/ws` - WebSocket, one binary snapshot per broadcast tick
//!
//! ## Snapshot
//! - `GET /api/fullproto` - Current snapshot as pretty JSON text
//! - `GET /api/obdtest` - One diagnostics batch
//!
//! ## Music
//! - `GET /api/musicconnected` - Whether a player is known
//! - `GET /api/music/:command` - Transport control
//! - `GET /api/music/seek/:seconds` - Seek
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! Anything else falls through to the static dashboard directory, when one
//! is configured.

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::hub::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api_routes = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/fullproto", get(routes::snapshot::full_snapshot))
        .route("/obdtest", get(routes::snapshot::diagnostics_test))
        .route("/musicconnected", get(routes::music::music_connected))
        .route("/music/seek/:seconds", get(routes::music::music_seek))
        .route("/music/:command", get(routes::music::music_command));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes);

    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "Serving dashboard files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Bind the listening socket
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ApiError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Dashlink listening on {}", addr);
    Ok(listener)
}

/// Serve requests until `stop` resolves
///
/// Once `stop` resolves the listener accepts nothing new and in-flight HTTP
/// requests run to completion. Open WebSockets are closed by the hub drain,
/// so the caller resolves `stop` first, then drains, then waits on this
/// future with a bound of its own.
pub async fn serve<F>(listener: TcpListener, router: Router, stop: F) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(stop)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))
}

/// Wait for SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, closing dashboard connections");
}
