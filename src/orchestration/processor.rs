//! # Ingestion Processor
//!
//! Top-level entry point for one batch of queue records. Each record walks
//! the flow classify → existence check → archivo resolution → move →
//! unzip → content validation → sub-file registration → enqueue-then-mark,
//! with failures routed by family: structural rejections escalate once,
//! technical failures go to the retry coordinator, fatal inconsistencies
//! propagate to the process boundary.
//!
//! Records are isolated: one poison message never blocks its batch
//! siblings. All database mutation groups commit atomically inside the
//! repository; the received → processing move makes redelivery of an
//! already-moved object fail closed on the existence check.

use super::escalation::ErrorEscalationService;
use super::retry::{RetryCoordinator, RetryOutcome};
use crate::archive::{self, ZipContentValidator, ZipValidationError};
use crate::config::RtaConfig;
use crate::constants::{attempt_states, error_codes};
use crate::error::{FailureKind, Result, RtaError};
use crate::messaging::{ArchivoRtaMessage, InboundRecord, QueueClient, StorageEventMessage};
use crate::models::{Archivo, NewArchivo, NewRtaProArchivo, NewRtaProcesamiento};
use crate::naming::{FileKind, NameGrammar};
use crate::persistence::ArchivoRepository;
use crate::state_machine::{ArchivoEvent, ArchivoState, ArchivoStateMachine, RtaProArchivoState};
use crate::storage::ObjectStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Storage areas and queue names the processor works across.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub bucket: String,
    pub recibidos_prefix: String,
    pub procesando_prefix: String,
    pub procesados_prefix: String,
    pub entrada_queue: String,
    pub salida_queue: String,
    pub plataforma_origen: String,
    pub estructural_template: String,
}

impl ProcessorSettings {
    pub fn from_config(config: &RtaConfig) -> Self {
        Self {
            bucket: config.storage.bucket.clone(),
            recibidos_prefix: config.storage.recibidos_prefix.clone(),
            procesando_prefix: config.storage.procesando_prefix.clone(),
            procesados_prefix: config.storage.procesados_prefix.clone(),
            entrada_queue: config.queues.entrada.clone(),
            salida_queue: config.queues.salida.clone(),
            plataforma_origen: config.plataforma.origen.clone(),
            estructural_template: config.notificaciones.template_estructural.clone(),
        }
    }
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Happy path completed; contents registered and dispatched
    Processed,
    /// Nothing to do: stale event, duplicate delivery, or malformed body
    Skipped,
    /// Structural failure escalated once
    Rejected,
    /// Technical failure republished with delay
    Retried,
    /// Technical failure escalated after exhausting retries
    Escalated,
}

/// Result of one batch, for logging and monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub records: usize,
    pub processed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub retried: usize,
    pub escalated: usize,
    pub processing_duration_ms: u64,
}

pub struct IngestionProcessor {
    grammar: NameGrammar,
    validator: ZipContentValidator,
    repository: Arc<dyn ArchivoRepository>,
    storage: Arc<dyn ObjectStore>,
    queue: Arc<dyn QueueClient>,
    state_machine: Arc<ArchivoStateMachine>,
    retry: RetryCoordinator,
    escalation: Arc<ErrorEscalationService>,
    settings: ProcessorSettings,
}

impl IngestionProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grammar: NameGrammar,
        validator: ZipContentValidator,
        repository: Arc<dyn ArchivoRepository>,
        storage: Arc<dyn ObjectStore>,
        queue: Arc<dyn QueueClient>,
        state_machine: Arc<ArchivoStateMachine>,
        retry: RetryCoordinator,
        escalation: Arc<ErrorEscalationService>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            grammar,
            validator,
            repository,
            storage,
            queue,
            state_machine,
            retry,
            escalation,
            settings,
        }
    }

    /// Handle one batch of inbound records.
    ///
    /// Per-record failures are contained; only fatal errors (configuration
    /// gaps, nonexistent records mid-flow, corrupt state) propagate, since
    /// retrying cannot fix them and the process must stop.
    #[instrument(skip(self, records), fields(batch_size = records.len()))]
    pub async fn process_batch(&self, records: Vec<InboundRecord>) -> Result<BatchResult> {
        let started = Instant::now();
        let mut result = BatchResult {
            records: records.len(),
            ..Default::default()
        };

        for record in records {
            match self.process_record(&record).await {
                Ok(RecordOutcome::Processed) => result.processed += 1,
                Ok(RecordOutcome::Skipped) => result.skipped += 1,
                Ok(RecordOutcome::Rejected) => result.rejected += 1,
                Ok(RecordOutcome::Retried) => result.retried += 1,
                Ok(RecordOutcome::Escalated) => result.escalated += 1,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal error; stopping batch");
                    return Err(e);
                }
                Err(e) => {
                    // non-fatal and not routed: leave the message for
                    // redelivery under the visibility timeout
                    warn!(
                        receipt_handle = record.receipt_handle,
                        error = %e,
                        "Record failed outside the routed paths; left for redelivery"
                    );
                    result.skipped += 1;
                }
            }
        }

        result.processing_duration_ms = started.elapsed().as_millis() as u64;
        info!(
            records = result.records,
            processed = result.processed,
            skipped = result.skipped,
            rejected = result.rejected,
            retried = result.retried,
            escalated = result.escalated,
            duration_ms = result.processing_duration_ms,
            "Batch handled"
        );
        Ok(result)
    }

    /// Handle one record end-to-end.
    #[instrument(skip(self, record), fields(receipt_handle = record.receipt_handle))]
    pub async fn process_record(&self, record: &InboundRecord) -> Result<RecordOutcome> {
        // 1. malformed bodies abort only this record
        let event = match StorageEventMessage::parse(&record.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Malformed event body; skipping record");
                self.queue
                    .delete(&self.settings.entrada_queue, record.receipt_handle)
                    .await?;
                return Ok(RecordOutcome::Skipped);
            }
        };
        let filename = event.filename().to_string();

        // 2. classify; invalid names escalate without creating a record
        let kind = self.grammar.classify(&filename);
        let today = Utc::now().date_naive();
        let structurally_valid = match kind {
            FileKind::Special => self.grammar.validate_special_structure(&filename, today),
            FileKind::General | FileKind::GeneralReversal => {
                self.grammar.validate_general_structure(&filename, today)
            }
            FileKind::Invalid => false,
        };
        if !structurally_valid {
            let reason = if kind == FileKind::Invalid {
                "matches neither configured family"
            } else {
                "family prefix matched but structure or date check failed"
            };
            warn!(filename = %filename, reason, "Invalid filename; escalating structurally");
            self.escalation
                .escalate(
                    &self.settings.estructural_template,
                    &event.bucket,
                    &event.key,
                    record.receipt_handle,
                    error_codes::NOMBRE_INVALIDO,
                    &filename,
                    None,
                )
                .await?;
            return Ok(RecordOutcome::Rejected);
        }

        // 3. the object must still exist; stale events are skipped without
        // fabricating a record
        if !self.storage.exists(&event.bucket, &event.key).await? {
            info!(bucket = %event.bucket, key = %event.key, "Object absent; stale event skipped");
            self.queue
                .delete(&self.settings.entrada_queue, record.receipt_handle)
                .await?;
            return Ok(RecordOutcome::Skipped);
        }

        // 4. resolve the archivo record per family policy
        let base_name = self.grammar.strip_prefix_and_extension(&filename);
        let archivo = match self.resolve_archivo(&event, record, kind, &filename, &base_name).await? {
            Some(archivo) => archivo,
            None => {
                // terminal-duplicate skip or general-file escalation;
                // outcome already decided inside
                return Ok(match kind {
                    FileKind::Special => RecordOutcome::Skipped,
                    _ => RecordOutcome::Rejected,
                });
            }
        };

        // 5–7. the load path; failures route by family
        match self
            .load_and_dispatch(&event, record, kind, &filename, &base_name, &archivo)
            .await
        {
            Ok(()) => Ok(RecordOutcome::Processed),
            Err(e) => self.route_failure(&event, record, &archivo, e).await,
        }
    }

    /// Send-pending sweep: replay enqueue-then-mark for every sub-file of
    /// the latest attempt still in `PENDIENTE_INICIO`. Returns how many
    /// were dispatched.
    #[instrument(skip(self))]
    pub async fn resend_pending(&self, archivo_id: i64) -> Result<usize> {
        let Some(attempt) = self.repository.latest_attempt(archivo_id).await? else {
            return Ok(0);
        };

        let pending = self
            .repository
            .pending_sub_files(archivo_id, attempt.id)
            .await?;
        let mut sent = 0;

        for sub_file in pending {
            let message = ArchivoRtaMessage {
                archivo_id,
                rta_procesamiento_id: attempt.id,
                nombre_archivo: sub_file.nombre_archivo.clone(),
                tipo_archivo_rta: sub_file.tipo_archivo_rta.clone(),
                bucket: self.settings.bucket.clone(),
                key: sub_file.ruta_archivo.clone(),
                enqueued_at: Utc::now(),
            };
            if self.enqueue_then_mark(&message).await? {
                sent += 1;
            }
        }

        info!(archivo_id, attempt_id = attempt.id, sent, "Pending sub-files swept");
        Ok(sent)
    }

    /// Step 4: family-dependent archivo resolution.
    ///
    /// Returns `None` when the record requires no further processing (the
    /// skip and escalation side effects have already run).
    async fn resolve_archivo(
        &self,
        event: &StorageEventMessage,
        record: &InboundRecord,
        kind: FileKind,
        filename: &str,
        base_name: &str,
    ) -> Result<Option<Archivo>> {
        let existing = self.repository.find_archivo_by_nombre(base_name).await?;

        match (kind, existing) {
            (_, Some(archivo)) => {
                let estado = archivo
                    .estado
                    .as_deref()
                    .and_then(|token| token.parse::<ArchivoState>().ok())
                    .ok_or_else(|| {
                        RtaError::inconsistency(format!(
                            "archivo {} has null or unrecognized estado",
                            archivo.id
                        ))
                    })?;

                if estado.is_terminal_success() {
                    info!(
                        archivo_id = archivo.id,
                        filename, "Archivo already dispatched; duplicate delivery skipped"
                    );
                    self.queue
                        .delete(&self.settings.entrada_queue, record.receipt_handle)
                        .await?;
                    return Ok(None);
                }
                Ok(Some(archivo))
            }
            (FileKind::Special, None) => {
                // special files originate outside the platform and are
                // created on first sight
                let nuevo = NewArchivo {
                    nombre_archivo: base_name.to_string(),
                    plataforma_origen: self.settings.plataforma_origen.clone(),
                    tipo_archivo: crate::constants::FileFamily::Especial.to_string(),
                    consecutivo_plataforma: self.grammar.extract_sequence(filename),
                    fecha_nombre_archivo: self.grammar.extract_date(filename),
                    fecha_ciclo: self.grammar.extract_date(filename),
                    estado: ArchivoState::Iniciado.to_string(),
                };
                let archivo = self.repository.create_archivo(nuevo).await?;
                info!(archivo_id = archivo.id, filename, "New special archivo registered");
                Ok(Some(archivo))
            }
            (_, None) => {
                // general files must already be known from an upstream
                // stage; absence escalates, never creates
                warn!(
                    filename,
                    base_name, "General file without an archivo record; escalating"
                );
                self.escalation
                    .escalate(
                        &self.settings.estructural_template,
                        &event.bucket,
                        &event.key,
                        record.receipt_handle,
                        error_codes::REGISTRO_NO_ENCONTRADO,
                        filename,
                        None,
                    )
                    .await?;
                Ok(None)
            }
        }
    }

    /// Steps 5–7: move, register attempt, unzip, validate, upload,
    /// register sub-files, dispatch.
    async fn load_and_dispatch(
        &self,
        event: &StorageEventMessage,
        record: &InboundRecord,
        kind: FileKind,
        filename: &str,
        base_name: &str,
        archivo: &Archivo,
    ) -> Result<()> {
        // 5a. archivo enters the loading state
        self.state_machine
            .transition(archivo.id, ArchivoEvent::StartLoading)
            .await?;

        // 5b. move received → processing; a redelivered message whose
        // object already moved carries the processing key and skips this
        let processing_key = format!("{}/{}", self.settings.procesando_prefix, filename);
        if event.key != processing_key {
            self.storage
                .move_object(&event.bucket, &event.key, &processing_key)
                .await?;
            debug!(from = %event.key, to = %processing_key, "Object moved to processing area");
        }

        // 5c. register the attempt
        let tipo_respuesta = self
            .validator
            .rules()
            .response_type_for(kind)
            .ok_or_else(|| {
                RtaError::configuration(format!("no response type mapped for {kind:?}"))
            })?
            .to_string();
        let attempt = self
            .repository
            .create_attempt(NewRtaProcesamiento {
                archivo_id: archivo.id,
                nombre_archivo_zip: filename.to_string(),
                tipo_respuesta: tipo_respuesta.clone(),
                estado: attempt_states::EN_PROCESO.to_string(),
            })
            .await?;

        // 6. unzip and validate; nothing is uploaded before validation
        let bytes = self.storage.get(&event.bucket, &processing_key).await?;
        let extracted = archive::unpack(&bytes)?;
        let nombres: Vec<String> = extracted.iter().map(|f| f.name.clone()).collect();

        self.validator
            .validate_contents(&tipo_respuesta, base_name, &nombres)
            .map_err(|e| self.validation_error(e))?;

        let manifest = self
            .validator
            .rules()
            .expected_manifest(&tipo_respuesta)
            .ok_or_else(|| {
                RtaError::configuration(format!("no manifest for response type {tipo_respuesta}"))
            })?;

        // 7a. upload validated contents to a timestamped folder, then drop
        // the source zip
        let destino = format!(
            "{}/{}",
            self.settings.procesados_prefix,
            Utc::now().format("%Y%m%d%H%M%S")
        );
        for file in &extracted {
            let key = format!("{destino}/{}", file.name);
            self.storage
                .put(&event.bucket, &key, file.contents.clone())
                .await?;
        }
        self.storage.delete(&event.bucket, &processing_key).await?;

        // 7b. register every sub-file in one transaction
        let nuevos: Vec<NewRtaProArchivo> = extracted
            .iter()
            .map(|file| NewRtaProArchivo {
                nombre_archivo: file.name.clone(),
                tipo_archivo_rta: ZipContentValidator::extract_suffix(manifest, &file.name)
                    .unwrap_or_default()
                    .to_string(),
                ruta_archivo: format!("{destino}/{}", file.name),
                estado: RtaProArchivoState::PendienteInicio.to_string(),
            })
            .collect();
        let registered = self
            .repository
            .register_sub_files(archivo.id, attempt.id, &nuevos)
            .await?;

        // 7c. enqueue-then-mark, never mark-then-enqueue; a failed enqueue
        // leaves the row pending for the sweep
        let mut dispatched = 0;
        for sub_file in &registered {
            let message = ArchivoRtaMessage {
                archivo_id: archivo.id,
                rta_procesamiento_id: attempt.id,
                nombre_archivo: sub_file.nombre_archivo.clone(),
                tipo_archivo_rta: sub_file.tipo_archivo_rta.clone(),
                bucket: self.settings.bucket.clone(),
                key: sub_file.ruta_archivo.clone(),
                enqueued_at: Utc::now(),
            };
            if self.enqueue_then_mark(&message).await? {
                dispatched += 1;
            }
        }
        if dispatched < registered.len() {
            warn!(
                archivo_id = archivo.id,
                dispatched,
                registered = registered.len(),
                "Some sub-files failed to enqueue; left pending for the sweep"
            );
        }

        // close out the attempt and the archivo
        self.repository
            .update_attempt_estado(archivo.id, attempt.id, attempt_states::PROCESADO, None, None)
            .await?;
        self.state_machine
            .transition(archivo.id, ArchivoEvent::Complete)
            .await?;
        self.queue
            .delete(&self.settings.entrada_queue, record.receipt_handle)
            .await?;

        info!(
            archivo_id = archivo.id,
            attempt_id = attempt.id,
            files = registered.len(),
            dispatched,
            "Archivo processed"
        );
        Ok(())
    }

    /// One sub-file dispatch. Returns whether the row was flipped to
    /// `ENVIADO`; an enqueue failure is logged and leaves it pending.
    async fn enqueue_then_mark(&self, message: &ArchivoRtaMessage) -> Result<bool> {
        let body = serde_json::to_value(message).map_err(|e| {
            RtaError::technical(error_codes::FALLO_TECNICO, "enqueue_sub_file", e.to_string())
        })?;

        if let Err(e) = self.queue.send(&self.settings.salida_queue, &body).await {
            warn!(
                archivo_id = message.archivo_id,
                nombre_archivo = %message.nombre_archivo,
                error = %e,
                "Sub-file enqueue failed; row stays pending"
            );
            return Ok(false);
        }

        self.repository
            .update_sub_file_estado(
                message.archivo_id,
                message.rta_procesamiento_id,
                &message.nombre_archivo,
                &RtaProArchivoState::Enviado.to_string(),
            )
            .await?;
        Ok(true)
    }

    /// Map a validation failure onto the crate taxonomy: unknown response
    /// types are configuration-fatal, everything else is structural.
    fn validation_error(&self, error: ZipValidationError) -> RtaError {
        match error.error_code() {
            Some(code) => RtaError::structural(code, error.to_string()),
            None => RtaError::configuration(error.to_string()),
        }
    }

    /// Step 8: route a load-path failure by its family.
    async fn route_failure(
        &self,
        event: &StorageEventMessage,
        record: &InboundRecord,
        archivo: &Archivo,
        error: RtaError,
    ) -> Result<RecordOutcome> {
        // wherever the flow failed, the object is in the processing area
        // if the move already happened, otherwise still at its event key
        let processing_key = format!("{}/{}", self.settings.procesando_prefix, event.filename());
        let current_key = if self.storage.exists(&event.bucket, &processing_key).await? {
            processing_key
        } else {
            event.key.clone()
        };

        match error.kind() {
            FailureKind::Structural => {
                let code = error.error_code().unwrap_or(error_codes::NOMBRE_INVALIDO).to_string();
                warn!(archivo_id = archivo.id, error = %error, "Structural failure; rejecting");

                self.state_machine
                    .transition(archivo.id, ArchivoEvent::Reject)
                    .await?;
                self.state_machine
                    .record_error(archivo.id, &code, &error.to_string())
                    .await?;
                if let Some(attempt) = self.repository.latest_attempt(archivo.id).await? {
                    self.repository
                        .update_attempt_estado(
                            archivo.id,
                            attempt.id,
                            attempt_states::RECHAZADO,
                            Some(&code),
                            Some(&error.to_string()),
                        )
                        .await?;
                }

                self.escalation
                    .escalate(
                        &self.settings.estructural_template,
                        &event.bucket,
                        &current_key,
                        record.receipt_handle,
                        &code,
                        event.filename(),
                        Some(archivo.id),
                    )
                    .await?;
                Ok(RecordOutcome::Rejected)
            }
            FailureKind::Technical => {
                let code = error.error_code().unwrap_or(error_codes::FALLO_TECNICO).to_string();
                let outcome = self
                    .retry
                    .handle_failure(
                        event,
                        &current_key,
                        record.receipt_handle,
                        archivo.id,
                        &code,
                        &error.to_string(),
                    )
                    .await?;
                Ok(match outcome {
                    RetryOutcome::Requeued { .. } => RecordOutcome::Retried,
                    RetryOutcome::Escalated => RecordOutcome::Escalated,
                })
            }
            FailureKind::Fatal => Err(error),
        }
    }
}
