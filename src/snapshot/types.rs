//! Snapshot data model
//!
//! - `Snapshot`: one timestamped composite of music and vehicle state
//! - `MusicStatus`: now-playing panel
//! - `CarStatus`: vehicle panel

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::sources::{Metric, PlayerInfo, Reading, SourceError, SourceResult};

/// One consolidated dashboard snapshot
///
/// Built fresh on every broadcast tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
    /// Music panel, absent if the player source had nothing this tick
    pub music: Option<MusicStatus>,
    /// Vehicle panel, absent if diagnostics failed this tick
    pub car: Option<CarStatus>,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(music: Option<MusicStatus>, car: Option<CarStatus>) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            music,
            car,
        }
    }

    /// Create a snapshot with a specific timestamp
    pub fn with_timestamp(music: Option<MusicStatus>, car: Option<CarStatus>, timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            music,
            car,
        }
    }
}

/// Now-playing state as sent to dashboards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicStatus {
    pub player_name: String,
    pub playback_status: String,
    /// Track length in milliseconds
    pub length_ms: i32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    /// Playback position in milliseconds
    pub position_ms: i32,
}

impl MusicStatus {
    /// Convert cached player state, extrapolating the position to `now`
    pub fn from_player(info: &PlayerInfo, now: Instant) -> Self {
        Self {
            player_name: info.player_name.clone(),
            playback_status: info.status.as_str().to_string(),
            length_ms: duration_ms(info.length),
            title: info.title.clone(),
            artist: info.artist.clone(),
            album: info.album.clone(),
            album_artist: info.album_artist.clone(),
            position_ms: duration_ms(info.position_at(now)),
        }
    }
}

/// Milliseconds, saturating at `i32::MAX` (about 24 days)
fn duration_ms(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

/// Vehicle state as sent to dashboards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarStatus {
    /// Percent
    pub fuel_level: f32,
    /// °C
    pub coolant_temp: i32,
    /// Percent
    pub engine_load: f32,
    pub engine_rpm: f32,
    /// kPa
    pub fuel_pressure: u32,
    /// km/h
    pub vehicle_speed: u32,
    /// °C
    pub intake_air_temp: i32,
}

impl CarStatus {
    /// Assemble a status from one batch of tagged readings
    ///
    /// Readings are matched by tag, so their order does not matter. Every
    /// metric must be present exactly once; otherwise no status is built.
    pub fn from_readings(readings: &[Reading]) -> SourceResult<Self> {
        let mut fuel_level = None;
        let mut coolant_temp = None;
        let mut engine_load = None;
        let mut engine_rpm = None;
        let mut fuel_pressure = None;
        let mut vehicle_speed = None;
        let mut intake_air_temp = None;

        fn fill<T>(slot: &mut Option<T>, value: T, metric: Metric) -> SourceResult<()> {
            if slot.replace(value).is_some() {
                return Err(SourceError::DuplicateReading(metric));
            }
            Ok(())
        }

        for reading in readings {
            let metric = reading.metric();
            match *reading {
                Reading::FuelLevel(v) => fill(&mut fuel_level, v, metric)?,
                Reading::CoolantTemp(v) => fill(&mut coolant_temp, v, metric)?,
                Reading::EngineLoad(v) => fill(&mut engine_load, v, metric)?,
                Reading::EngineRpm(v) => fill(&mut engine_rpm, v, metric)?,
                Reading::FuelPressure(v) => fill(&mut fuel_pressure, v, metric)?,
                Reading::VehicleSpeed(v) => fill(&mut vehicle_speed, v, metric)?,
                Reading::IntakeAirTemp(v) => fill(&mut intake_air_temp, v, metric)?,
            }
        }

        Ok(Self {
            fuel_level: fuel_level.ok_or(SourceError::MissingReading(Metric::FuelLevel))?,
            coolant_temp: coolant_temp.ok_or(SourceError::MissingReading(Metric::CoolantTemp))?,
            engine_load: engine_load.ok_or(SourceError::MissingReading(Metric::EngineLoad))?,
            engine_rpm: engine_rpm.ok_or(SourceError::MissingReading(Metric::EngineRpm))?,
            fuel_pressure: fuel_pressure
                .ok_or(SourceError::MissingReading(Metric::FuelPressure))?,
            vehicle_speed: vehicle_speed
                .ok_or(SourceError::MissingReading(Metric::VehicleSpeed))?,
            intake_air_temp: intake_air_temp
                .ok_or(SourceError::MissingReading(Metric::IntakeAirTemp))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PlaybackStatus;

    fn full_batch() -> Vec<Reading> {
        vec![
            Reading::FuelLevel(55.2),
            Reading::CoolantTemp(90),
            Reading::EngineLoad(31.5),
            Reading::EngineRpm(2150.0),
            Reading::FuelPressure(320),
            Reading::VehicleSpeed(42),
            Reading::IntakeAirTemp(24),
        ]
    }

    #[test]
    fn test_car_status_from_readings() {
        let status = CarStatus::from_readings(&full_batch()).unwrap();

        assert_eq!(status.fuel_level, 55.2);
        assert_eq!(status.coolant_temp, 90);
        assert_eq!(status.engine_rpm, 2150.0);
        assert_eq!(status.vehicle_speed, 42);
        assert_eq!(status.intake_air_temp, 24);
    }

    #[test]
    fn test_car_status_order_independent() {
        let mut readings = full_batch();
        readings.reverse();
        assert_eq!(
            CarStatus::from_readings(&readings).unwrap(),
            CarStatus::from_readings(&full_batch()).unwrap()
        );
    }

    #[test]
    fn test_car_status_missing_reading() {
        let readings: Vec<Reading> = full_batch()
            .into_iter()
            .filter(|r| r.metric() != Metric::FuelPressure)
            .collect();

        assert_eq!(
            CarStatus::from_readings(&readings).unwrap_err(),
            SourceError::MissingReading(Metric::FuelPressure)
        );
    }

    #[test]
    fn test_car_status_duplicate_reading() {
        let mut readings = full_batch();
        readings.push(Reading::VehicleSpeed(43));

        assert_eq!(
            CarStatus::from_readings(&readings).unwrap_err(),
            SourceError::DuplicateReading(Metric::VehicleSpeed)
        );
    }

    #[test]
    fn test_music_status_from_player() {
        let info = PlayerInfo::new("Spotify")
            .track("Song", "Artist", "Album", Duration::from_millis(210_000))
            .status(PlaybackStatus::Paused)
            .position(Duration::from_millis(12_345));

        let status = MusicStatus::from_player(&info, Instant::now());
        assert_eq!(status.player_name, "Spotify");
        assert_eq!(status.playback_status, "paused");
        assert_eq!(status.length_ms, 210_000);
        assert_eq!(status.position_ms, 12_345);
        assert_eq!(status.album_artist, "Artist");
    }

    #[test]
    fn test_snapshot_json_field_names() {
        let snapshot = Snapshot::with_timestamp(
            Some(MusicStatus::default()),
            Some(CarStatus::default()),
            1_700_000_000_000,
        );
        let json = serde_json::to_string(&snapshot).unwrap();

        assert!(json.contains("\"timestampMs\":1700000000000"));
        assert!(json.contains("\"playerName\""));
        assert!(json.contains("\"albumArtist\""));
        assert!(json.contains("\"fuelLevel\""));
        assert!(json.contains("\"intakeAirTemp\""));
    }
}
