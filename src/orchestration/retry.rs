//! # Retry Coordinator
//!
//! Decides what happens to a technical failure: requeue with the
//! configured delay while retries remain, escalate terminally once the
//! limit is reached. The decision itself is a pure function over
//! `(retry_count, max_retries)`; the coordinator wraps it with the side
//! effects (state transition, counters, delayed redelivery or escalation).
//!
//! The retry count travels in the message payload, incremented by exactly
//! one per requeue; the limits and delay come from configuration per
//! failure domain and are treated as opaque inputs.

use super::escalation::ErrorEscalationService;
use crate::config::RetryPolicyConfig;
use crate::constants::attempt_states;
use crate::error::{Result, RtaError};
use crate::messaging::{QueueClient, StorageEventMessage};
use crate::persistence::ArchivoRepository;
use crate::state_machine::{ArchivoEvent, ArchivoStateMachine};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Pure retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Requeue,
    Escalate,
}

/// `Requeue` while retries remain, `Escalate` once the limit is reached.
pub fn decide(retry_count: u32, max_retries: u32) -> RetryDecision {
    if retry_count < max_retries {
        RetryDecision::Requeue
    } else {
        RetryDecision::Escalate
    }
}

/// What the coordinator did with one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Message republished with delay; archivo waiting for redelivery
    Requeued { retry_count: u32 },
    /// Retries exhausted; archivo failed terminally and escalation ran
    Escalated,
}

pub struct RetryCoordinator {
    state_machine: Arc<ArchivoStateMachine>,
    repository: Arc<dyn ArchivoRepository>,
    queue: Arc<dyn QueueClient>,
    escalation: Arc<ErrorEscalationService>,
    policy: RetryPolicyConfig,
    entrada_queue: String,
    fallo_tecnico_template: String,
}

impl RetryCoordinator {
    pub fn new(
        state_machine: Arc<ArchivoStateMachine>,
        repository: Arc<dyn ArchivoRepository>,
        queue: Arc<dyn QueueClient>,
        escalation: Arc<ErrorEscalationService>,
        policy: RetryPolicyConfig,
        entrada_queue: impl Into<String>,
        fallo_tecnico_template: impl Into<String>,
    ) -> Self {
        Self {
            state_machine,
            repository,
            queue,
            escalation,
            policy,
            entrada_queue: entrada_queue.into(),
            fallo_tecnico_template: fallo_tecnico_template.into(),
        }
    }

    /// Route one technical failure.
    ///
    /// `current_key` is where the object sits *now* (it may already have
    /// been moved to the processing area); a requeued message points there
    /// so the redelivery finds it, and an escalation parks it from there.
    #[instrument(skip(self, event), fields(archivo_id, error_code))]
    pub async fn handle_failure(
        &self,
        event: &StorageEventMessage,
        current_key: &str,
        receipt_handle: i64,
        archivo_id: i64,
        error_code: &str,
        detalle: &str,
    ) -> Result<RetryOutcome> {
        match decide(event.retry_count, self.policy.max_retries) {
            RetryDecision::Requeue => {
                self.requeue(event, current_key, receipt_handle, archivo_id, error_code, detalle)
                    .await
            }
            RetryDecision::Escalate => {
                self.escalate(event, current_key, receipt_handle, archivo_id, error_code, detalle)
                    .await
            }
        }
    }

    async fn requeue(
        &self,
        event: &StorageEventMessage,
        current_key: &str,
        receipt_handle: i64,
        archivo_id: i64,
        error_code: &str,
        detalle: &str,
    ) -> Result<RetryOutcome> {
        self.state_machine
            .transition(archivo_id, ArchivoEvent::ScheduleRetry(error_code.to_string()))
            .await?;
        self.state_machine
            .record_error(archivo_id, error_code, detalle)
            .await?;

        self.repository.increment_intentos_cargue(archivo_id).await?;
        if let Some(attempt) = self.repository.latest_attempt(archivo_id).await? {
            self.repository
                .increment_attempt_intentos(archivo_id, attempt.id)
                .await?;
        }

        let mut retried = event.for_retry();
        retried.key = current_key.to_string();
        let body = serde_json::to_value(&retried)
            .map_err(|e| RtaError::technical(error_code, "requeue", e.to_string()))?;

        // redelivery, not re-peek: publish the delayed copy, then drop the
        // original so only one in-flight message exists per file
        self.queue
            .send_delayed(&self.entrada_queue, &body, self.policy.delay_seconds)
            .await?;
        self.queue.delete(&self.entrada_queue, receipt_handle).await?;

        info!(
            archivo_id,
            error_code,
            retry_count = retried.retry_count,
            delay_seconds = self.policy.delay_seconds,
            "Technical failure requeued with delay"
        );
        Ok(RetryOutcome::Requeued {
            retry_count: retried.retry_count,
        })
    }

    async fn escalate(
        &self,
        event: &StorageEventMessage,
        current_key: &str,
        receipt_handle: i64,
        archivo_id: i64,
        error_code: &str,
        detalle: &str,
    ) -> Result<RetryOutcome> {
        warn!(
            archivo_id,
            error_code,
            retry_count = event.retry_count,
            max_retries = self.policy.max_retries,
            "Retries exhausted; escalating terminally"
        );

        self.state_machine
            .transition(archivo_id, ArchivoEvent::Exhaust(error_code.to_string()))
            .await?;
        self.state_machine
            .record_error(archivo_id, error_code, detalle)
            .await?;

        // the current attempt, when one exists for this failure, fails too
        if let Some(attempt) = self.repository.latest_attempt(archivo_id).await? {
            self.repository
                .update_attempt_estado(
                    archivo_id,
                    attempt.id,
                    attempt_states::FALLIDO,
                    Some(error_code),
                    Some(detalle),
                )
                .await?;
        }

        self.escalation
            .escalate(
                &self.fallo_tecnico_template,
                &event.bucket,
                current_key,
                receipt_handle,
                error_code,
                event.filename(),
                Some(archivo_id),
            )
            .await?;

        Ok(RetryOutcome::Escalated)
    }
}
