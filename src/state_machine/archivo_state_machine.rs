//! # Archivo State Machine
//!
//! Lifecycle management for one logical response file. The transition
//! policy is fixed in code; the valid-state *vocabulary* comes from
//! configuration so operations can extend it without a deploy, but a
//! policy target missing from the configured set is refused rather than
//! silently written.
//!
//! Every accepted transition persists atomically: the archivo's `estado`
//! update and the append-only `archivo_estados` audit row commit in one
//! database transaction, so no observer ever sees a half-applied change.

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::ArchivoEvent,
    states::ArchivoState,
};
use crate::persistence::ArchivoRepository;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State machine over the persisted archivo record.
pub struct ArchivoStateMachine {
    repository: Arc<dyn ArchivoRepository>,
    valid_states: HashSet<String>,
}

impl ArchivoStateMachine {
    pub fn new(repository: Arc<dyn ArchivoRepository>, valid_states: &[String]) -> Self {
        Self {
            repository,
            valid_states: valid_states.iter().cloned().collect(),
        }
    }

    /// Current state of an archivo, resolved from the database.
    ///
    /// A missing archivo is fatal (a later stage cannot legally reference a
    /// nonexistent record). A null or unrecognized `estado` is an
    /// unrecoverable inconsistency, also fatal.
    pub async fn current_state(&self, archivo_id: i64) -> StateMachineResult<ArchivoState> {
        let archivo = self
            .repository
            .find_archivo(archivo_id)
            .await?
            .ok_or(StateMachineError::ArchivoNotFound { archivo_id })?;

        let token = archivo
            .estado
            .ok_or_else(|| StateMachineError::CorruptState {
                archivo_id,
                detail: "estado is null".to_string(),
            })?;

        token
            .parse()
            .map_err(|_| StateMachineError::CorruptState {
                archivo_id,
                detail: format!("unrecognized estado '{token}'"),
            })
    }

    /// Attempt to transition the archivo in response to an event.
    ///
    /// Reads the current state, determines the target from the fixed
    /// policy, verifies the target is in the configured valid-state set and
    /// persists the change (estado update plus audit row, atomically).
    pub async fn transition(
        &self,
        archivo_id: i64,
        event: ArchivoEvent,
    ) -> StateMachineResult<ArchivoState> {
        let current = self.current_state(archivo_id).await?;
        let target = Self::determine_target_state(current, &event)?;

        let target_token = target.to_string();
        if !self.valid_states.contains(&target_token) {
            warn!(
                archivo_id,
                state = %target_token,
                "Refusing transition to a state outside the configured set"
            );
            return Err(StateMachineError::InvalidTargetState {
                state: target_token,
            });
        }

        self.repository
            .transition_archivo(
                archivo_id,
                &current.to_string(),
                &target_token,
                Utc::now().naive_utc(),
            )
            .await?;

        if let Some(code) = event.error_code() {
            debug!(archivo_id, error_code = code, "Transition carried an error code");
        }
        info!(archivo_id, from = %current, to = %target, "Archivo transitioned");
        Ok(target)
    }

    /// Attach an error annotation without changing state.
    pub async fn record_error(
        &self,
        archivo_id: i64,
        codigo: &str,
        detalle: &str,
    ) -> StateMachineResult<()> {
        // annotation on a nonexistent archivo is the same fatal condition
        // as transitioning one
        self.current_state(archivo_id).await?;
        self.repository
            .record_archivo_error(archivo_id, codigo, detalle)
            .await?;
        Ok(())
    }

    /// Fixed transition policy.
    pub fn determine_target_state(
        current: ArchivoState,
        event: &ArchivoEvent,
    ) -> StateMachineResult<ArchivoState> {
        use ArchivoState as S;

        let target = match (current, event) {
            (S::Iniciado, ArchivoEvent::StartLoading) => S::CargandoRtaProcesamiento,
            // retry re-entry: a redelivered message starts loading again
            (S::ProcesaPendienteReintento, ArchivoEvent::StartLoading) => {
                S::CargandoRtaProcesamiento
            }
            // a corrected file re-dropped after a terminal failure opens a
            // fresh attempt; only terminal success blocks reprocessing
            (S::ProcesamientoRechazado, ArchivoEvent::StartLoading) => {
                S::CargandoRtaProcesamiento
            }
            (S::ProcesamientoFallido, ArchivoEvent::StartLoading) => S::CargandoRtaProcesamiento,
            // idempotent self-entry: a visibility-timeout duplicate, or a
            // redelivery after a crash mid-load, must not poison the consumer
            (S::CargandoRtaProcesamiento, ArchivoEvent::StartLoading) => {
                S::CargandoRtaProcesamiento
            }

            (S::CargandoRtaProcesamiento, ArchivoEvent::Complete) => S::Procesado,
            (S::CargandoRtaProcesamiento, ArchivoEvent::Reject) => S::ProcesamientoRechazado,
            (S::Iniciado, ArchivoEvent::Reject) => S::ProcesamientoRechazado,

            (S::CargandoRtaProcesamiento, ArchivoEvent::ScheduleRetry(_)) => {
                S::ProcesaPendienteReintento
            }
            (S::Iniciado, ArchivoEvent::ScheduleRetry(_)) => S::ProcesaPendienteReintento,

            (S::CargandoRtaProcesamiento, ArchivoEvent::Exhaust(_)) => S::ProcesamientoFallido,
            (S::ProcesaPendienteReintento, ArchivoEvent::Exhaust(_)) => S::ProcesamientoFallido,
            (S::Iniciado, ArchivoEvent::Exhaust(_)) => S::ProcesamientoFallido,

            (from, event) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from.to_string(),
                    event: format!("{event:?}"),
                })
            }
        };

        Ok(target)
    }
}
