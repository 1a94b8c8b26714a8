//! Snapshot wire encoding
//!
//! Binary frames (WebSocket push) use bincode; the one-shot text endpoint
//! uses pretty-printed JSON. A binary payload is encoded once per tick and
//! shared by every connection.

use std::sync::Arc;

use super::error::SnapshotResult;
use super::types::Snapshot;

/// Encoded snapshot shared across connections without copying
pub type Payload = Arc<[u8]>;

/// Encode a snapshot for WebSocket delivery
pub fn encode_binary(snapshot: &Snapshot) -> SnapshotResult<Payload> {
    let bytes = bincode::serialize(snapshot)?;
    Ok(bytes.into())
}

/// Decode a binary snapshot frame
pub fn decode_binary(bytes: &[u8]) -> SnapshotResult<Snapshot> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encode a snapshot as human-readable text
pub fn encode_text(snapshot: &Snapshot) -> SnapshotResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Decode a text snapshot
pub fn decode_text(text: &str) -> SnapshotResult<Snapshot> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CarStatus, MusicStatus, SnapshotError};

    fn literal_snapshot() -> Snapshot {
        Snapshot::with_timestamp(
            Some(MusicStatus {
                player_name: "Spotify".to_string(),
                playback_status: "playing".to_string(),
                length_ms: 210_000,
                title: "Roygbiv".to_string(),
                artist: "Boards of Canada".to_string(),
                album: "Music Has the Right to Children".to_string(),
                album_artist: "Boards of Canada".to_string(),
                position_ms: 61_500,
            }),
            Some(CarStatus {
                fuel_level: 55.2,
                coolant_temp: 91,
                engine_load: 27.4,
                engine_rpm: 1830.0,
                fuel_pressure: 310,
                vehicle_speed: 42,
                intake_air_temp: 22,
            }),
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_binary_round_trip() {
        let snapshot = literal_snapshot();
        let payload = encode_binary(&snapshot).unwrap();
        let decoded = decode_binary(&payload).unwrap();

        assert_eq!(decoded, snapshot);
        let music = decoded.music.unwrap();
        assert_eq!(music.player_name, "Spotify");
        assert_eq!(music.playback_status, "playing");
        assert_eq!(music.length_ms, 210_000);
        let car = decoded.car.unwrap();
        assert_eq!(car.fuel_level, 55.2);
        assert_eq!(car.vehicle_speed, 42);
    }

    #[test]
    fn test_text_round_trip() {
        let snapshot = literal_snapshot();
        let text = encode_text(&snapshot).unwrap();
        assert!(text.contains("\"playerName\": \"Spotify\""));

        assert_eq!(decode_text(&text).unwrap(), snapshot);
    }

    #[test]
    fn test_absent_panels_survive_encoding() {
        let snapshot = Snapshot::with_timestamp(None, None, 5);
        let decoded = decode_binary(&encode_binary(&snapshot).unwrap()).unwrap();
        assert!(decoded.music.is_none());
        assert!(decoded.car.is_none());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_binary(&[0xFF, 0x01]),
            Err(SnapshotError::Serialization(_))
        ));
        assert!(decode_text("not json").is_err());
    }
}
