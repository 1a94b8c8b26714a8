//! Real-Time Broadcast Hub
//!
//! Streams dashboard snapshots to every connected client.
//!
//! ## Architecture
//!
//! - **ConnectionRegistry**: the set of open connections
//! - **ConnectionHandle**: per-connection outbound queue, drained by a
//!   dedicated writer task
//! - **BroadcastScheduler**: builds a snapshot every tick and fans it out
//! - **Handler**: WebSocket upgrade and read loop
//! - **ShutdownCoordinator**: bounded close-everything on termination
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://dashboard.local:8080/api/ws');
//! ws.binaryType = 'arraybuffer';
//!
//! ws.onmessage = (event) => {
//!   // bincode-encoded snapshot, pushed every 500 ms
//!   render(decodeSnapshot(new Uint8Array(event.data)));
//! };
//! ```

mod broadcast;
mod connection;
mod error;
mod handler;
mod registry;
mod shutdown;

pub use broadcast::{fan_out, BroadcastScheduler, FanoutReport, TickOutcome};
pub use connection::{
    spawn_writer, CloseAck, ConnectionHandle, ConnectionId, ConnectionState, Frame, FrameSink,
    OutboundQueue,
};
pub use error::HubError;
pub use handler::websocket_handler;
pub use registry::{ConnectionRegistry, HubConfig};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, NORMAL_CLOSURE, SHUTDOWN_REASON};
