//! Single-fault state machine.
//!
//! Idle -> Active only through `inject`, Active -> Idle only through `clear`.
//! Progress is never stored: it is recomputed from the activation time on
//! every call, so it cannot run ahead of the clock.

use crate::config::FAULT_DURATION_MS;
use crate::error::SimError;
use crate::simulation::faults::FaultKind;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultPhase {
    Idle,
    Active {
        kind: FaultKind,
        started_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct FaultController {
    phase: FaultPhase,
    duration_ms: i64,
}

impl FaultController {
    pub fn new() -> Self {
        Self::with_duration_ms(FAULT_DURATION_MS)
    }

    pub fn with_duration_ms(duration_ms: i64) -> Self {
        Self {
            phase: FaultPhase::Idle,
            duration_ms: duration_ms.max(1),
        }
    }

    /// Activate `kind` at `now`. Rejected while another fault is active.
    pub fn inject(&mut self, kind: FaultKind, now: DateTime<Utc>) -> Result<(), SimError> {
        match self.phase {
            FaultPhase::Active { kind: current, .. } => Err(SimError::FaultAlreadyActive(current)),
            FaultPhase::Idle => {
                self.phase = FaultPhase::Active {
                    kind,
                    started_at: now,
                };
                Ok(())
            }
        }
    }

    /// Return to Idle, yielding the fault that was active (if any).
    pub fn clear(&mut self) -> Option<FaultKind> {
        let previous = self.active_kind();
        self.phase = FaultPhase::Idle;
        previous
    }

    pub fn phase(&self) -> FaultPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, FaultPhase::Active { .. })
    }

    pub fn active_kind(&self) -> Option<FaultKind> {
        match self.phase {
            FaultPhase::Active { kind, .. } => Some(kind),
            FaultPhase::Idle => None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            FaultPhase::Active { started_at, .. } => Some(started_at),
            FaultPhase::Idle => None,
        }
    }

    /// Elapsed fraction of the development duration, clamped to [0, 1].
    /// `None` while Idle.
    pub fn progress(&self, now: DateTime<Utc>) -> Option<f64> {
        let started_at = self.started_at()?;
        let elapsed_ms = (now - started_at).num_milliseconds();
        Some((elapsed_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0))
    }
}

impl Default for FaultController {
    fn default() -> Self {
        Self::new()
    }
}
