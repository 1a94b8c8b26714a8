//! WebSocket Handler
//!
//! Handles `/api/ws` upgrades and the per-connection lifecycle: register,
//! read until close or error, unregister. Telemetry is never written from
//! here; it arrives through the connection's outbound queue.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use super::connection::{spawn_writer, ConnectionHandle, Frame, FrameSink};
use super::error::HubError;
use super::registry::ConnectionRegistry;
use crate::api::AppState;

/// How long the reader stays up after the writer finishes, to take the
/// client's close reply
const CLOSE_REPLY_GRACE: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = Arc::clone(&state.registry);
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), HubError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(payload) => Message::Binary(payload.to_vec()),
            Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })),
        };
        self.send(message).await?;
        Ok(())
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (mut sink, mut stream) = socket.split();
    let (handle, queue) = ConnectionHandle::with_capacity(registry.config().queue_capacity);

    let connection_id = match registry.register(handle.clone()).await {
        Ok(id) => id,
        Err(e) => {
            let code = match e {
                HubError::ShuttingDown => {
                    tracing::debug!("Rejecting WebSocket connection during shutdown");
                    close_code::AWAY
                }
                _ => {
                    tracing::error!(error = %e, "Failed to register WebSocket connection");
                    close_code::AGAIN
                }
            };
            let _ = sink
                .send_frame(Frame::Close {
                    code,
                    reason: e.to_string(),
                })
                .await;
            return;
        }
    };

    let mut writer = spawn_writer(handle.clone(), queue, sink, Arc::clone(&registry));

    let mut reader = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(message) => {
                    if !handle_message(&handle, message) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %handle.id(),
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either side to finish
    tokio::select! {
        _ = &mut writer => {
            if tokio::time::timeout(CLOSE_REPLY_GRACE, &mut reader).await.is_err() {
                reader.abort();
            }
        }
        _ = &mut reader => {
            writer.abort();
        }
    }

    registry.unregister(&connection_id).await;
}

/// Handle one inbound message
///
/// Returns false if the connection should be closed.
fn handle_message(handle: &ConnectionHandle, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            tracing::trace!(connection_id = %handle.id(), text = %text, "Echoing text frame");
            if let Err(e) = handle.send(Frame::Text(text)) {
                tracing::debug!(connection_id = %handle.id(), error = %e, "Echo failed");
                return false;
            }
            true
        }
        Message::Binary(data) => {
            tracing::warn!(
                connection_id = %handle.id(),
                bytes = data.len(),
                "Binary frames from clients are not supported, ignoring"
            );
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings itself
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id(), "Client requested close");
            false
        }
    }
}
