//! # Processing Error Types
//!
//! Crate-wide error taxonomy for response-file ingestion. Every failure a
//! component can surface belongs to one of four families, and the family
//! decides the routing: structural failures are escalated once and never
//! retried, technical failures go through the retry coordinator, missing
//! records are fatal or escalated depending on the file family, and
//! configuration failures stop the process because retrying cannot invent
//! missing configuration.
//!
//! No component terminates the process directly; fatal conditions are typed
//! values the caller propagates to the entry point.

use thiserror::Error;

/// How a failure must be routed once it surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Escalate once (rejected area + notification), never retry.
    Structural,
    /// Route through the retry coordinator; escalate after the limit.
    Technical,
    /// Stop handling; propagate to the process boundary.
    Fatal,
}

/// Crate-wide error type for the ingestion core.
#[derive(Error, Debug)]
pub enum RtaError {
    #[error("Structural failure [{code}]: {reason}")]
    Structural { code: String, reason: String },

    #[error("Technical failure [{code}] during {operation}: {message}")]
    Technical {
        code: String,
        operation: String,
        message: String,
    },

    #[error("Record not found [{code}]: {entity} '{reference}'")]
    RecordNotFound {
        code: String,
        entity: String,
        reference: String,
    },

    #[error("Fatal inconsistency: {message}")]
    Inconsistency { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("State machine error: {0}")]
    StateMachine(#[from] crate::state_machine::StateMachineError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] crate::messaging::MessagingError),

    #[error("Object store error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl RtaError {
    pub fn structural(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structural {
            code: code.into(),
            reason: reason.into(),
        }
    }

    pub fn technical(
        code: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Technical {
            code: code.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn record_not_found(
        code: impl Into<String>,
        entity: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::RecordNotFound {
            code: code.into(),
            entity: entity.into(),
            reference: reference.into(),
        }
    }

    pub fn inconsistency(message: impl Into<String>) -> Self {
        Self::Inconsistency {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Routing family for this error.
    ///
    /// Missing records escalate (the caller already decided the record was
    /// mandatory when it raised the error); inconsistencies, configuration
    /// gaps and state machine refusals stop the process; persistence and
    /// messaging failures are connectivity problems and therefore retryable.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Structural { .. } | Self::RecordNotFound { .. } => FailureKind::Structural,
            Self::Technical { .. } | Self::Persistence(_) | Self::Messaging(_) | Self::Storage(_) => {
                FailureKind::Technical
            }
            Self::StateMachine(e) => {
                if e.is_fatal() {
                    FailureKind::Fatal
                } else {
                    FailureKind::Technical
                }
            }
            Self::Inconsistency { .. } | Self::Configuration { .. } => FailureKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == FailureKind::Fatal
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Technical
    }

    /// Catalog code carried by this error, when one applies.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Structural { code, .. }
            | Self::Technical { code, .. }
            | Self::RecordNotFound { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RtaError>;
