//! Fault Perturbation Model
//!
//! Each fault drives one primary channel hard (a near-linear creep plus an
//! oscillation whose amplitude or frequency grows with progress) and couples
//! more weakly into one or two secondary channels. The effects are looked up
//! in a dispatch table keyed by `(FaultKind, SensorId)`; channels without an
//! entry pass through untouched.

use crate::algo::gaussian;
use crate::config::SensorId;
use crate::error::SimError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    BearingWear,
    HeaterFailure,
    PressureBlockage,
    MotorOverload,
}

impl FaultKind {
    pub const ALL: [FaultKind; 4] = [
        FaultKind::BearingWear,
        FaultKind::HeaterFailure,
        FaultKind::PressureBlockage,
        FaultKind::MotorOverload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::BearingWear => "bearing_wear",
            FaultKind::HeaterFailure => "heater_failure",
            FaultKind::PressureBlockage => "pressure_blockage",
            FaultKind::MotorOverload => "motor_overload",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FaultKind::BearingWear => "Bearing Wear",
            FaultKind::HeaterFailure => "Heater Failure",
            FaultKind::PressureBlockage => "Pressure Blockage",
            FaultKind::MotorOverload => "Motor Overload",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FaultKind::BearingWear => "Gradual vibration increase with harmonic patterns",
            FaultKind::HeaterFailure => "Temperature drift down with oscillation",
            FaultKind::PressureBlockage => "Pressure spike with current increase",
            FaultKind::MotorOverload => "Current spike with vibration increase",
        }
    }

    /// Channel the fault hits hardest.
    pub fn primary_sensor(self) -> SensorId {
        match self {
            FaultKind::BearingWear => SensorId::Vibration,
            FaultKind::HeaterFailure => SensorId::Temperature,
            FaultKind::PressureBlockage => SensorId::Pressure,
            FaultKind::MotorOverload => SensorId::Current,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaultKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::UnknownFaultKind(s.to_string()))
    }
}

/// Catalog entry for listing faults to clients.
#[derive(Serialize, Debug, Clone)]
pub struct FaultInfo {
    pub kind: FaultKind,
    pub name: &'static str,
    pub description: &'static str,
    pub primary_sensor: SensorId,
    /// Every channel the fault perturbs, primary first.
    pub affected_sensors: Vec<SensorId>,
}

pub fn catalog() -> Vec<FaultInfo> {
    FaultKind::ALL
        .into_iter()
        .map(|kind| FaultInfo {
            kind,
            name: kind.display_name(),
            description: kind.description(),
            primary_sensor: kind.primary_sensor(),
            affected_sensors: affected_sensors(kind),
        })
        .collect()
}

/// Additive offset for one channel: `(progress, tick, rng) -> delta`.
pub type Perturbation = fn(f64, u64, &mut dyn RngCore) -> f64;

const EFFECTS: &[(FaultKind, SensorId, Perturbation)] = &[
    (FaultKind::BearingWear, SensorId::Vibration, bearing_vibration),
    (FaultKind::BearingWear, SensorId::Current, bearing_current),
    (FaultKind::HeaterFailure, SensorId::Temperature, heater_temperature),
    (FaultKind::HeaterFailure, SensorId::Pressure, heater_pressure),
    (FaultKind::PressureBlockage, SensorId::Pressure, blockage_pressure),
    (FaultKind::PressureBlockage, SensorId::Current, blockage_current),
    (FaultKind::PressureBlockage, SensorId::Vibration, blockage_vibration),
    (FaultKind::MotorOverload, SensorId::Current, overload_current),
    (FaultKind::MotorOverload, SensorId::Vibration, overload_vibration),
    (FaultKind::MotorOverload, SensorId::Temperature, overload_temperature),
];

pub fn perturbation(kind: FaultKind, sensor: SensorId) -> Option<Perturbation> {
    EFFECTS
        .iter()
        .find(|(k, s, _)| *k == kind && *s == sensor)
        .map(|(_, _, effect)| *effect)
}

/// Channels touched by `kind`, primary first.
pub fn affected_sensors(kind: FaultKind) -> Vec<SensorId> {
    EFFECTS
        .iter()
        .filter(|(k, _, _)| *k == kind)
        .map(|(_, s, _)| *s)
        .collect()
}

/// Perturb a healthy reading. No-op until the fault has made progress.
pub fn apply(
    value: f64,
    kind: FaultKind,
    progress: f64,
    tick: u64,
    sensor: SensorId,
    rng: &mut dyn RngCore,
) -> f64 {
    if progress <= 0.0 {
        return value;
    }
    let progress = progress.min(1.0);
    match perturbation(kind, sensor) {
        Some(effect) => value + effect(progress, tick, rng),
        None => value,
    }
}

// --- Bearing wear ---

fn bearing_vibration(progress: f64, tick: u64, _rng: &mut dyn RngCore) -> f64 {
    let t = tick as f64;
    let creep = progress * 8.0;
    let freq = 15.0 + progress * 10.0;
    let amp = progress * 2.0;
    let harmonic = (t * freq * 0.01).sin() * amp;
    let second = (t * freq * 0.02).sin() * amp * 0.5;
    creep + harmonic + second
}

fn bearing_current(progress: f64, _tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 5.0
}

// --- Heater failure ---

fn heater_temperature(progress: f64, tick: u64, _rng: &mut dyn RngCore) -> f64 {
    let drop = -progress * 80.0;
    let oscillation = (tick as f64 * 0.05).sin() * (5.0 + progress * 15.0);
    drop + oscillation
}

fn heater_pressure(progress: f64, tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 200.0 * (tick as f64 * 0.03).sin()
}

// --- Pressure blockage ---

fn blockage_pressure(progress: f64, tick: u64, _rng: &mut dyn RngCore) -> f64 {
    let spike = progress * 1000.0;
    let surge = (tick as f64 * 0.08).sin() * progress * 100.0;
    spike + surge
}

fn blockage_current(progress: f64, _tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 15.0
}

fn blockage_vibration(progress: f64, _tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 1.5
}

// --- Motor overload ---

fn overload_current(progress: f64, tick: u64, rng: &mut dyn RngCore) -> f64 {
    let spike = progress * 20.0;
    let instability = (tick as f64 * 0.15).sin() * progress * 5.0;
    let jitter = gaussian::sample(rng, 0.0, progress * 2.0);
    spike + instability + jitter
}

fn overload_vibration(progress: f64, tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 4.0 + (tick as f64 * 0.2).sin() * progress * 1.5
}

fn overload_temperature(progress: f64, _tick: u64, _rng: &mut dyn RngCore) -> f64 {
    progress * 15.0
}
