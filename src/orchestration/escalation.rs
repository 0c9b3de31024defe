//! # Error Escalation Service
//!
//! Terminal error path. Escalating a failure means: park the offending
//! object in the rejected area (partitioned by year-month), delete the
//! originating queue message, resolve the error code against the catalog,
//! and dispatch the configured notification unless the owning archivo
//! already completed successfully. The rejected-area move happens before
//! any notification so a human reviewing either sees consistent artifacts.

use crate::config::StorageConfig;
use crate::error::{Result, RtaError};
use crate::messaging::QueueClient;
use crate::notifications::{build_parametros, EmailMessage, Notifier};
use crate::persistence::ArchivoRepository;
use crate::state_machine::ArchivoState;
use crate::storage::ObjectStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of one escalation, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Object parked and notification enqueued
    Notified,
    /// Object parked; notification suppressed (already-processed archivo,
    /// unresolvable code, or unfillable template)
    Suppressed,
}

pub struct ErrorEscalationService {
    storage: Arc<dyn ObjectStore>,
    queue: Arc<dyn QueueClient>,
    repository: Arc<dyn ArchivoRepository>,
    notifier: Arc<dyn Notifier>,
    rechazados_prefix: String,
    entrada_queue: String,
}

impl ErrorEscalationService {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        queue: Arc<dyn QueueClient>,
        repository: Arc<dyn ArchivoRepository>,
        notifier: Arc<dyn Notifier>,
        storage_config: &StorageConfig,
        entrada_queue: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            queue,
            repository,
            notifier,
            rechazados_prefix: storage_config.rechazados_prefix.clone(),
            entrada_queue: entrada_queue.into(),
        }
    }

    /// Escalate one failure terminally.
    ///
    /// `archivo_id` is `None` for structural rejections that never created
    /// a record; the suppression check only applies when a record exists.
    #[instrument(skip(self), fields(error_code, filename))]
    pub async fn escalate(
        &self,
        template_id: &str,
        bucket: &str,
        key: &str,
        receipt_handle: i64,
        error_code: &str,
        filename: &str,
        archivo_id: Option<i64>,
    ) -> Result<EscalationOutcome> {
        // 1. park the object, partitioned by year-month
        let rejected_key = format!(
            "{}/{}/{}",
            self.rechazados_prefix,
            Utc::now().format("%Y-%m"),
            filename
        );
        if self.storage.exists(bucket, key).await? {
            self.storage.move_object(bucket, key, &rejected_key).await?;
            info!(bucket, from = key, to = %rejected_key, "Object moved to rejected area");
        } else {
            // already moved by an earlier delivery of the same failure
            warn!(bucket, key, "Object absent during escalation; skipping move");
        }

        // 2. the message is handled, terminally
        self.queue.delete(&self.entrada_queue, receipt_handle).await?;

        // 3. an error that cannot be described cannot be notified about
        let Some(catalogo) = self.repository.find_catalog_error(error_code).await? else {
            warn!(
                error_code,
                filename, "Error code missing from catalog; escalation stops without notifying"
            );
            return Ok(EscalationOutcome::Suppressed);
        };

        // 4. never notify about a file that already completed
        if let Some(id) = archivo_id {
            if let Some(archivo) = self.repository.find_archivo(id).await? {
                let terminal_success = archivo
                    .estado
                    .as_deref()
                    .and_then(|token| token.parse::<ArchivoState>().ok())
                    .is_some_and(|state| state.is_terminal_success());
                if terminal_success {
                    info!(
                        archivo_id = id,
                        filename, "Archivo already processed; notification suppressed"
                    );
                    return Ok(EscalationOutcome::Suppressed);
                }
            }
        }

        // 5. build and enqueue the notification
        let Some(template) = self.notifier.lookup_template(template_id) else {
            warn!(template_id, "Notification template not configured; suppressing");
            return Ok(EscalationOutcome::Suppressed);
        };
        if template.parametros.is_empty() {
            warn!(
                template_id,
                "Template declares no parameters; suppressing rather than sending malformed"
            );
            return Ok(EscalationOutcome::Suppressed);
        }

        let parametros =
            build_parametros(&template, filename, &catalogo.codigo, &catalogo.descripcion);
        self.notifier
            .enqueue(EmailMessage {
                template_id: template.id.clone(),
                asunto: template.asunto.clone(),
                destinatarios: template.destinatarios.clone(),
                parametros,
            })
            .await
            .map_err(RtaError::from)?;

        info!(error_code, filename, template_id, "Escalation notified");
        Ok(EscalationOutcome::Notified)
    }
}
