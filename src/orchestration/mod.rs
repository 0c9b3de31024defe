//! # Orchestration
//!
//! The per-message ingestion flow and its failure policy: the processor
//! sequences the happy path, the retry coordinator decides requeue versus
//! escalation for technical failures, and the escalation service owns the
//! terminal error path.

pub mod escalation;
pub mod processor;
pub mod retry;

pub use escalation::{ErrorEscalationService, EscalationOutcome};
pub use processor::{BatchResult, IngestionProcessor, ProcessorSettings, RecordOutcome};
pub use retry::{decide, RetryCoordinator, RetryDecision, RetryOutcome};
