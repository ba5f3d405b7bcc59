//! machine-sim: a simulated four-channel machine sensor engine.
//!
//! A fixed-rate scheduler samples vibration, temperature, pressure and
//! current from stochastic generators, optionally perturbs them with one
//! developing fault, smooths the readings and runs an anomaly detector over
//! each channel. Every tick produces an immutable [`SystemState`] snapshot.

pub mod algo;
pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod metrics;
pub mod runtime;
pub mod scheduler;
pub mod simulation;

pub use config::{SENSOR_CONFIGS, SensorConfig, SensorId, ServerConfig};
pub use detector::{Detection, DetectionContext};
pub use error::SimError;
pub use runtime::{MonotonicClock, SimulationHandle, SimulationRuntime};
pub use scheduler::SimulationScheduler;
pub use simulation::{FaultKind, FaultState, SensorReading, SensorState, Status, SystemState};
