//! # Dashlink
//!
//! Live telemetry hub for an in-car dashboard. Aggregates vehicle
//! diagnostics, media player state and camera availability into one
//! snapshot, and streams it to every connected dashboard over WebSocket.
//!
//! ## Features
//!
//! - **Periodic broadcast**: a fresh snapshot every 500 ms, encoded once and
//!   delivered to all clients
//! - **Failure isolation**: every connection has its own outbound queue and
//!   writer task, so one dead client never stalls the rest
//! - **Bounded shutdown**: all clients get a normal-closure frame, with a
//!   hard deadline on the whole drain
//! - **Pluggable sources**: diagnostics, media player and camera sit behind
//!   traits, with simulated adapters for bench use
//!
//! ## Modules
//!
//! - [`sources`]: diagnostics, media and camera adapters
//! - [`snapshot`]: snapshot model, builder and codecs
//! - [`hub`]: connection registry, broadcast loop, WebSocket handler, shutdown
//! - [`api`]: HTTP API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashlink::hub::{BroadcastScheduler, ConnectionRegistry, HubConfig};
//! use dashlink::snapshot::SnapshotBuilder;
//! use dashlink::sources::{MediaCache, SimulatedDiagnostics};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(ConnectionRegistry::new(HubConfig::default()));
//!     let builder = Arc::new(SnapshotBuilder::new(
//!         Arc::new(SimulatedDiagnostics::new()),
//!         MediaCache::fixed(None),
//!         Duration::from_secs(2),
//!     ));
//!
//!     let scheduler = Arc::new(BroadcastScheduler::new(
//!         builder,
//!         registry,
//!         Duration::from_millis(500),
//!     ));
//!     let _ = scheduler.tick().await;
//! }
//! ```

pub mod api;
pub mod config;
pub mod hub;
pub mod snapshot;
pub mod sources;

pub use config::Config;
pub use hub::{BroadcastScheduler, ConnectionRegistry, ShutdownCoordinator, ShutdownOutcome};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotError};
pub use sources::SourceError;
