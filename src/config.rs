//! Static Sensor Configuration and Engine Constants
//!
//! The four channels are compiled in and never reconfigured at runtime.
//! Everything the outer surface may tune lives in [`ServerConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;

// --- Engine constants ---

/// Fixed tick period (10 Hz).
pub const TICK_INTERVAL_MS: u64 = 100;
pub const TICKS_PER_SECOND: f64 = 1000.0 / TICK_INTERVAL_MS as f64;

/// 60 seconds of history at 10 Hz.
pub const HISTORY_CAPACITY: usize = 600;

/// Wall-clock time for a fault to develop from progress 0 to 1.
pub const FAULT_DURATION_MS: i64 = 45_000;

/// Baseline readings captured while idle.
pub const BASELINE_CAPACITY: usize = 50;
/// Baseline becomes the detector reference once it holds this many readings.
pub const BASELINE_MIN_READINGS: usize = 30;

/// EMA weight of the newest raw reading.
pub const EMA_ALPHA: f64 = 0.4;

/// Trailing window used for the regression slope.
pub const TREND_WINDOW: usize = 15;

/// Demo calibration for days-to-failure. Not a physical constant: the
/// simulation runs far faster than a real machine degrades, so extrapolated
/// days are stretched by this factor and clamped for presentation.
pub const FAILURE_CALIBRATION_MULTIPLIER: f64 = 500.0;
pub const MIN_DAYS_TO_FAILURE: f64 = 0.1;
pub const MAX_DAYS_TO_FAILURE: f64 = 30.0;

// --- Sensor channels ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    Vibration,
    Temperature,
    Pressure,
    Current,
}

impl SensorId {
    /// Channel order used for iteration, snapshots and factor lists.
    pub const ALL: [SensorId; 4] = [
        SensorId::Vibration,
        SensorId::Temperature,
        SensorId::Pressure,
        SensorId::Current,
    ];

    pub fn config(self) -> &'static SensorConfig {
        &SENSOR_CONFIGS[self.index()]
    }

    pub fn index(self) -> usize {
        match self {
            SensorId::Vibration => 0,
            SensorId::Temperature => 1,
            SensorId::Pressure => 2,
            SensorId::Current => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorId::Vibration => "vibration",
            SensorId::Temperature => "temperature",
            SensorId::Pressure => "pressure",
            SensorId::Current => "current",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one physical channel.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub id: SensorId,
    pub name: &'static str,
    pub unit: &'static str,
    /// Absolute range the instrument can report.
    pub min: f64,
    pub max: f64,
    /// Healthy operating band.
    pub normal_min: f64,
    pub normal_max: f64,
    /// Distance from the band center at which the channel turns Warning / Critical.
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub noise_level: f64,
    /// Starting value of the EMA smoother.
    pub initial_value: f64,
}

impl SensorConfig {
    pub fn center(&self) -> f64 {
        (self.normal_min + self.normal_max) / 2.0
    }

    pub fn normal_range(&self) -> f64 {
        self.normal_max - self.normal_min
    }

    pub fn clamp_to_range(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub const SENSOR_CONFIGS: [SensorConfig; 4] = [
    SensorConfig {
        id: SensorId::Vibration,
        name: "Vibration",
        unit: "mm/s",
        min: 0.0,
        max: 15.0,
        normal_min: 2.0,
        normal_max: 4.0,
        warning_threshold: 6.0,
        critical_threshold: 10.0,
        noise_level: 0.15,
        initial_value: 3.0,
    },
    SensorConfig {
        id: SensorId::Temperature,
        name: "Barrel Temp",
        unit: "°F",
        min: 300.0,
        max: 500.0,
        normal_min: 380.0,
        normal_max: 420.0,
        warning_threshold: 40.0,
        critical_threshold: 60.0,
        noise_level: 2.0,
        initial_value: 400.0,
    },
    SensorConfig {
        id: SensorId::Pressure,
        name: "Melt Pressure",
        unit: "PSI",
        min: 2000.0,
        max: 4500.0,
        normal_min: 2800.0,
        normal_max: 3200.0,
        warning_threshold: 400.0,
        critical_threshold: 700.0,
        noise_level: 25.0,
        initial_value: 3000.0,
    },
    SensorConfig {
        id: SensorId::Current,
        name: "Motor Current",
        unit: "amps",
        min: 30.0,
        max: 80.0,
        normal_min: 45.0,
        normal_max: 55.0,
        warning_threshold: 10.0,
        critical_threshold: 18.0,
        noise_level: 0.8,
        initial_value: 50.0,
    },
];

// --- Outer surface ---

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: String,
    /// Port to listen on (default: 8080)
    pub port: u16,
    /// Fixed RNG seed for reproducible runs; OS entropy when absent
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
