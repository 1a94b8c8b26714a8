//! Vehicle diagnostics adapter
//!
//! A diagnostics source answers one query per [`Metric`] with a tagged
//! [`Reading`]. The hub always asks for the full set of seven metrics in one
//! batch, and the batch is all-or-nothing: one failed metric fails the whole
//! batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::{SourceError, SourceResult};

/// Metrics the dashboard displays for the vehicle panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FuelLevel,
    CoolantTemp,
    EngineLoad,
    EngineRpm,
    FuelPressure,
    VehicleSpeed,
    IntakeAirTemp,
}

impl Metric {
    /// Every metric, in the order the batch request issues them
    pub const ALL: [Metric; 7] = [
        Metric::FuelLevel,
        Metric::CoolantTemp,
        Metric::EngineLoad,
        Metric::EngineRpm,
        Metric::FuelPressure,
        Metric::VehicleSpeed,
        Metric::IntakeAirTemp,
    ];

    /// Metric name as used in logs and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::FuelLevel => "fuel_level",
            Metric::CoolantTemp => "coolant_temp",
            Metric::EngineLoad => "engine_load",
            Metric::EngineRpm => "engine_rpm",
            Metric::FuelPressure => "fuel_pressure",
            Metric::VehicleSpeed => "vehicle_speed",
            Metric::IntakeAirTemp => "intake_air_temp",
        }
    }

    /// OBD-II mode 01 PID for this metric
    pub fn pid(&self) -> u8 {
        match self {
            Metric::FuelLevel => 0x2F,
            Metric::CoolantTemp => 0x05,
            Metric::EngineLoad => 0x04,
            Metric::EngineRpm => 0x0C,
            Metric::FuelPressure => 0x0A,
            Metric::VehicleSpeed => 0x0D,
            Metric::IntakeAirTemp => 0x0F,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded metric value, tagged with the metric it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Fuel tank level, percent
    FuelLevel(f32),
    /// Engine coolant temperature, °C
    CoolantTemp(i32),
    /// Calculated engine load, percent
    EngineLoad(f32),
    /// Engine speed, rpm
    EngineRpm(f32),
    /// Fuel rail gauge pressure, kPa
    FuelPressure(u32),
    /// Vehicle speed, km/h
    VehicleSpeed(u32),
    /// Intake air temperature, °C
    IntakeAirTemp(i32),
}

impl Reading {
    /// Which metric this reading answers
    pub fn metric(&self) -> Metric {
        match self {
            Reading::FuelLevel(_) => Metric::FuelLevel,
            Reading::CoolantTemp(_) => Metric::CoolantTemp,
            Reading::EngineLoad(_) => Metric::EngineLoad,
            Reading::EngineRpm(_) => Metric::EngineRpm,
            Reading::FuelPressure(_) => Metric::FuelPressure,
            Reading::VehicleSpeed(_) => Metric::VehicleSpeed,
            Reading::IntakeAirTemp(_) => Metric::IntakeAirTemp,
        }
    }
}

/// A source of vehicle diagnostics readings
#[async_trait]
pub trait DiagnosticsSource: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &str;

    /// Query a single metric
    async fn query(&self, metric: Metric) -> SourceResult<Reading>;

    /// Query several metrics as one batch
    ///
    /// Fails as soon as any single query fails; no partial result is ever
    /// returned. Each reading is checked against the metric that was asked
    /// for.
    async fn query_batch(&self, metrics: &[Metric]) -> SourceResult<Vec<Reading>> {
        let mut readings = Vec::with_capacity(metrics.len());
        for &metric in metrics {
            let reading = self.query(metric).await?;
            if reading.metric() != metric {
                return Err(SourceError::UnexpectedReading {
                    requested: metric,
                    got: reading.metric(),
                });
            }
            readings.push(reading);
        }
        Ok(readings)
    }
}

/// Simulated diagnostics device
///
/// Produces slowly varying, plausible readings derived from the time since
/// creation. Used when `diagnostics.simulated` is set.
pub struct SimulatedDiagnostics {
    started: Instant,
}

impl SimulatedDiagnostics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Sine wave between `lo` and `hi` with the given period in seconds
    fn wave(&self, period_secs: f64, lo: f64, hi: f64) -> f64 {
        let t = self.started.elapsed().as_secs_f64();
        let phase = (t / period_secs * std::f64::consts::TAU).sin();
        lo + (hi - lo) * (0.5 + 0.5 * phase)
    }
}

impl Default for SimulatedDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiagnosticsSource for SimulatedDiagnostics {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn query(&self, metric: Metric) -> SourceResult<Reading> {
        let reading = match metric {
            Metric::FuelLevel => {
                // One percent per minute, refilled at 5%
                let used = (self.started.elapsed().as_secs_f64() / 60.0) % 70.0;
                Reading::FuelLevel((75.0 - used) as f32)
            }
            Metric::CoolantTemp => Reading::CoolantTemp(self.wave(120.0, 82.0, 96.0).round() as i32),
            Metric::EngineLoad => Reading::EngineLoad(self.wave(7.0, 18.0, 64.0) as f32),
            Metric::EngineRpm => Reading::EngineRpm(self.wave(11.0, 780.0, 3400.0) as f32),
            Metric::FuelPressure => Reading::FuelPressure(self.wave(5.0, 290.0, 350.0) as u32),
            Metric::VehicleSpeed => Reading::VehicleSpeed(self.wave(11.0, 0.0, 110.0) as u32),
            Metric::IntakeAirTemp => {
                Reading::IntakeAirTemp(self.wave(300.0, 18.0, 41.0).round() as i32)
            }
        };
        Ok(reading)
    }
}

/// Diagnostics adapter used when no device could be opened
///
/// Every query reports the source as unavailable, so the vehicle panel stays
/// blank while the rest of the dashboard keeps streaming.
pub struct OfflineDiagnostics {
    reason: String,
}

impl OfflineDiagnostics {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DiagnosticsSource for OfflineDiagnostics {
    fn name(&self) -> &str {
        "offline"
    }

    async fn query(&self, _metric: Metric) -> SourceResult<Reading> {
        Err(SourceError::Unavailable(self.reason.clone()))
    }
}
