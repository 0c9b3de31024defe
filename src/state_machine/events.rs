use serde::{Deserialize, Serialize};

/// Events that drive archivo state transitions.
///
/// The (state, event) pairs the machine accepts are fixed policy; the event
/// only names *what happened*, the machine decides the target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchivoEvent {
    /// A processing attempt started loading the zip contents
    StartLoading,
    /// All contents validated, registered and dispatched
    Complete,
    /// Structural rejection (bad name or bad contents)
    Reject,
    /// Technical failure with retries remaining; carries the catalog code
    ScheduleRetry(String),
    /// Technical failure with retries exhausted; carries the catalog code
    Exhaust(String),
}

impl ArchivoEvent {
    /// Catalog error code carried by failure events.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::ScheduleRetry(code) | Self::Exhaust(code) => Some(code),
            _ => None,
        }
    }
}
