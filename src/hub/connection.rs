//! Dashboard Connections
//!
//! Every connection owns a bounded FIFO outbound queue drained by its own
//! writer task. Broadcasts, echoes and close notifications are all enqueued,
//! so a slow or broken client only ever stalls its own writer, and frames on
//! one connection are written in the order they were issued.
//!
//! A client that stops reading is dropped rather than buffered for: its
//! queue fills and further sends fail, and its writer gives up on any frame
//! that takes longer than the hub's write timeout.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::HubError;
use super::registry::ConnectionRegistry;
use crate::snapshot::Payload;

/// Unique identifier for a dashboard connection
pub type ConnectionId = Uuid;

/// Outbound queue depth for handles created with [`ConnectionHandle::new`]
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// An outbound WebSocket frame, independent of the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Payload),
    Close { code: u16, reason: String },
}

/// Acknowledgement for a close notification
pub type CloseAck = oneshot::Receiver<Result<(), HubError>>;

/// Items on a connection's outbound queue
#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Close {
        code: u16,
        reason: String,
        ack: oneshot::Sender<Result<(), HubError>>,
    },
}

/// Lifecycle of a connection
///
/// Only ever moves forward: `Open → Closing → Closed`, or straight from
/// `Open` to `Closed` when the writer stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Open = 0,
    /// A close notification has been queued
    Closing = 1,
    /// The writer has stopped
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Open,
            1 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Handle for sending to one connection
///
/// Cloned into the registry, the connection handler and the writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Outbound>,
    state: Arc<AtomicU8>,
}

/// Receiving end of a connection's outbound queue, consumed by its writer
#[derive(Debug)]
pub struct OutboundQueue {
    rx: mpsc::Receiver<Outbound>,
}

impl OutboundQueue {
    /// Next queued frame without waiting, for inspecting a queue with no writer
    #[cfg(test)]
    pub(crate) fn try_next_frame(&mut self) -> Option<Frame> {
        match self.rx.try_recv().ok()? {
            Outbound::Frame(frame) => Some(frame),
            Outbound::Close { code, reason, .. } => Some(Frame::Close { code, reason }),
        }
    }
}

impl ConnectionHandle {
    /// Create a handle with a fresh id and its outbound queue
    pub fn new() -> (Self, OutboundQueue) {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a handle whose queue holds at most `capacity` frames
    pub fn with_capacity(capacity: usize) -> (Self, OutboundQueue) {
        let (sender, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            sender,
            state: Arc::new(AtomicU8::new(ConnectionState::Open as u8)),
        };
        (handle, OutboundQueue { rx })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
    }

    /// Queue a frame for delivery
    ///
    /// Fails if the writer has stopped, or if the queue is full because the
    /// client is not reading.
    pub fn send(&self, frame: Frame) -> Result<(), HubError> {
        if self.state() == ConnectionState::Closed {
            return Err(HubError::ConnectionClosed);
        }
        self.sender
            .try_send(Outbound::Frame(frame))
            .map_err(|e| self.queue_error(e))
    }

    /// Queue a close notification
    ///
    /// The returned ack resolves once the writer has written the close frame
    /// (or failed to). Frames queued after the close are dropped. Only the
    /// first close on an open connection is accepted. A close that finds the
    /// queue full still leaves the connection `Closing`; its writer moves it
    /// to `Closed` when the stuck write times out.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<CloseAck, HubError> {
        if !self.transition(ConnectionState::Open, ConnectionState::Closing) {
            return Err(HubError::ConnectionClosed);
        }

        let (ack, rx) = oneshot::channel();
        let queued = self.sender.try_send(Outbound::Close {
            code,
            reason: reason.into(),
            ack,
        });

        match queued {
            Ok(()) => Ok(rx),
            Err(e) => Err(self.queue_error(e)),
        }
    }

    fn queue_error<T>(&self, err: TrySendError<T>) -> HubError {
        match err {
            TrySendError::Full(_) => HubError::QueueFull(self.sender.max_capacity()),
            TrySendError::Closed(_) => {
                self.mark_closed();
                HubError::ConnectionClosed
            }
        }
    }
}

/// Transport-side sink for outbound frames
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), HubError>;
}

/// Spawn the writer task for a connection
///
/// The writer drains the outbound queue into `sink` until the queue closes,
/// a write fails or times out, or a close frame has been sent. On exit it
/// marks the connection closed and removes it from the registry.
pub fn spawn_writer<S>(
    handle: ConnectionHandle,
    queue: OutboundQueue,
    sink: S,
    registry: Arc<ConnectionRegistry>,
) -> JoinHandle<()>
where
    S: FrameSink + 'static,
{
    tokio::spawn(run_writer(handle, queue, sink, registry))
}

async fn run_writer<S: FrameSink>(
    handle: ConnectionHandle,
    mut queue: OutboundQueue,
    mut sink: S,
    registry: Arc<ConnectionRegistry>,
) {
    let connection_id = handle.id();
    let write_timeout = registry.config().write_timeout;

    while let Some(outbound) = queue.rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = write_frame(&mut sink, frame, write_timeout).await {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket write failed, dropping connection"
                    );
                    break;
                }
            }
            Outbound::Close { code, reason, ack } => {
                let close = Frame::Close { code, reason };
                let result = write_frame(&mut sink, close, write_timeout).await;
                if let Err(e) = &result {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Close notification failed"
                    );
                }
                let _ = ack.send(result);
                break;
            }
        }
    }

    handle.mark_closed();
    queue.rx.close();
    registry.unregister(&connection_id).await;
}

async fn write_frame<S: FrameSink>(
    sink: &mut S,
    frame: Frame,
    limit: std::time::Duration,
) -> Result<(), HubError> {
    tokio::time::timeout(limit, sink.send_frame(frame))
        .await
        .map_err(|_| HubError::WriteTimeout(limit))?
}
