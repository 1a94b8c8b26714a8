//! Dashboard Snapshots
//!
//! One snapshot is assembled per broadcast tick from the source adapters,
//! encoded once and fanned out to every connected dashboard.
//!
//! ## Wire schema
//!
//! ```text
//! Msg         { timestampMs, music: MusicStatus, car: CarStatus }
//! MusicStatus { playerName, playbackStatus, lengthMs, title, artist,
//!               album, albumArtist, positionMs }
//! CarStatus   { fuelLevel, coolantTemp, engineLoad, engineRpm,
//!               fuelPressure, vehicleSpeed, intakeAirTemp }
//! ```
//!
//! Binary frames carry the bincode encoding; `/api/fullproto` serves the
//! same structure as pretty-printed JSON.

mod builder;
pub mod codec;
mod error;
mod types;

pub use builder::SnapshotBuilder;
pub use codec::{decode_binary, decode_text, encode_binary, encode_text, Payload};
pub use error::{SnapshotError, SnapshotResult};
pub use types::{CarStatus, MusicStatus, Snapshot};
