use crate::config::{SensorConfig, SensorId};
use crate::simulation::faults::FaultKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One processed sample of a channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    /// Range-clamped value before smoothing.
    pub raw_value: f64,
    /// EMA-smoothed value; the detector works on this.
    pub value: f64,
}

/// Severity classification, ordered Normal < Warning < Critical.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Critical => "critical",
        }
    }

    /// Numeric level, used for the status gauge.
    pub fn level(self) -> u8 {
        match self {
            Status::Normal => 0,
            Status::Warning => 1,
            Status::Critical => 2,
        }
    }
}

/// Per-channel view derived each tick.
#[derive(Serialize, Debug, Clone)]
pub struct SensorState {
    pub sensor: SensorId,
    pub config: &'static SensorConfig,
    pub current_value: f64,
    pub raw_value: f64,
    pub status: Status,
    pub z_score: f64,
    pub rate_of_change: f64,
    pub is_anomalous: bool,
    pub confidence: f64,
    pub readings: Vec<SensorReading>,
}

impl SensorState {
    pub fn initial(sensor: SensorId) -> Self {
        let config = sensor.config();
        Self {
            sensor,
            config,
            current_value: config.initial_value,
            raw_value: config.initial_value,
            status: Status::Normal,
            z_score: 0.0,
            rate_of_change: 0.0,
            is_anomalous: false,
            confidence: 0.0,
            readings: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FaultState {
    pub kind: FaultKind,
    pub active: bool,
    /// Development in [0, 1].
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    pub days_to_failure: Option<f64>,
}

/// Immutable snapshot published once per tick.
#[derive(Serialize, Debug, Clone)]
pub struct SystemState {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    /// Channels in `SensorId::ALL` order.
    pub sensors: Vec<SensorState>,
    pub active_fault: Option<FaultState>,
    pub overall_status: Status,
    pub days_to_failure: Option<f64>,
    pub anomaly_details: Vec<String>,
}

impl SystemState {
    pub fn initial(timestamp: DateTime<Utc>) -> Self {
        Self {
            tick: 0,
            timestamp,
            sensors: SensorId::ALL.iter().map(|&id| SensorState::initial(id)).collect(),
            active_fault: None,
            overall_status: Status::Normal,
            days_to_failure: None,
            anomaly_details: Vec::new(),
        }
    }

    pub fn sensor(&self, id: SensorId) -> &SensorState {
        &self.sensors[id.index()]
    }

    pub fn anomalous_count(&self) -> usize {
        self.sensors.iter().filter(|s| s.is_anomalous).count()
    }
}
