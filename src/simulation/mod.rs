//! Signal simulation: healthy generators, fault perturbations, the fault
//! state machine and the snapshot types handed to consumers.

pub mod controller;
pub mod faults;
pub mod generator;
pub mod types;

pub use controller::{FaultController, FaultPhase};
pub use faults::{FaultInfo, FaultKind};
pub use generator::SignalGenerator;
pub use types::{FaultState, SensorReading, SensorState, Status, SystemState};
