use crate::simulation::faults::FaultKind;

/// Errors returned by the engine's command surface.
///
/// A rejected command never changes engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    UnknownFaultKind(String),
    FaultAlreadyActive(FaultKind),
    EngineStopped,
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFaultKind(name) => write!(f, "Unknown fault kind: {}", name),
            Self::FaultAlreadyActive(kind) => {
                write!(f, "Fault already active: {} (clear it first)", kind)
            }
            Self::EngineStopped => write!(f, "Simulation engine is not running"),
        }
    }
}

impl std::error::Error for SimError {}
