//! State machine error types.
//!
//! Refusals here are typed so callers can distinguish "this transition is
//! illegal" (fatal policy violation) from plain persistence failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Target state '{state}' is not in the configured valid-state set")]
    InvalidTargetState { state: String },

    #[error("Archivo {archivo_id} does not exist")]
    ArchivoNotFound { archivo_id: i64 },

    #[error("Archivo {archivo_id} has an unusable estado: {detail}")]
    CorruptState { archivo_id: i64, detail: String },

    #[error("Persistence failure during transition: {0}")]
    Database(#[from] sqlx::Error),
}

impl StateMachineError {
    /// Everything except plain persistence failures is a policy violation
    /// the process must stop on; a connectivity blip is retryable upstream.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
