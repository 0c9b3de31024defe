//! Shared in-memory collaborator doubles for the integration suites.
//!
//! Each mock records its calls behind an `Arc<Mutex<State>>` so tests can
//! assert on side effects (objects moved, messages sent, rows flipped)
//! without a live database, queue or object store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rta_core::config::RtaConfig;
use rta_core::manifest::ManifestRules;
use rta_core::messaging::{InboundRecord, MessagingError, MessagingResult, QueueClient};
use rta_core::models::{
    Archivo, ArchivoEstado, CatalogoError, NewArchivo, NewRtaProArchivo, NewRtaProcesamiento,
    RtaProArchivo, RtaProcesamiento,
};
use rta_core::notifications::{EmailMessage, EmailTemplate, Notifier};
use rta_core::orchestration::{
    ErrorEscalationService, IngestionProcessor, ProcessorSettings, RetryCoordinator,
};
use rta_core::persistence::ArchivoRepository;
use rta_core::state_machine::ArchivoStateMachine;
use rta_core::storage::{ObjectStore, StorageResult};
use rta_core::naming::NameGrammar;
use rta_core::archive::ZipContentValidator;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Object store double

#[derive(Default)]
pub struct MockObjectStore {
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MockObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
    }

    pub fn has(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn keys_with_prefix(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.has(bucket, key))
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                rta_core::storage::StorageError::new("get", bucket, key, "no such object")
            })
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.seed(bucket, key, bytes);
        Ok(())
    }

    async fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> StorageResult<()> {
        let bytes = self.get(bucket, src_key).await?;
        self.seed(bucket, dst_key, bytes);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_by_prefix(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self.keys_with_prefix(bucket, prefix))
    }
}

// ---------------------------------------------------------------------------
// Queue double

#[derive(Default)]
pub struct MockQueueState {
    pub sent: Vec<(String, serde_json::Value)>,
    pub delayed: Vec<(String, serde_json::Value, u64)>,
    pub deleted: Vec<(String, i64)>,
    pub fail_send_queues: HashSet<String>,
}

#[derive(Default)]
pub struct MockQueueClient {
    pub state: Mutex<MockQueueState>,
}

impl MockQueueClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_sends_to(&self, queue: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_send_queues
            .insert(queue.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().fail_send_queues.clear();
    }

    pub fn sent_to(&self, queue: &str) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(q, _)| q == queue)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn delayed_to(&self, queue: &str) -> Vec<(serde_json::Value, u64)> {
        self.state
            .lock()
            .unwrap()
            .delayed
            .iter()
            .filter(|(q, _, _)| q == queue)
            .map(|(_, body, delay)| (body.clone(), *delay))
            .collect()
    }

    pub fn deleted_handles(&self, queue: &str) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .deleted
            .iter()
            .filter(|(q, _)| q == queue)
            .map(|(_, handle)| *handle)
            .collect()
    }
}

#[async_trait]
impl QueueClient for MockQueueClient {
    async fn create_queue(&self, _queue_name: &str) -> MessagingResult<()> {
        Ok(())
    }

    async fn send(&self, queue_name: &str, body: &serde_json::Value) -> MessagingResult<i64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send_queues.contains(queue_name) {
            return Err(MessagingError::queue_operation(
                queue_name,
                "send",
                "simulated outage",
            ));
        }
        state.sent.push((queue_name.to_string(), body.clone()));
        Ok(state.sent.len() as i64)
    }

    async fn send_delayed(
        &self,
        queue_name: &str,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> MessagingResult<i64> {
        let mut state = self.state.lock().unwrap();
        state
            .delayed
            .push((queue_name.to_string(), body.clone(), delay_seconds));
        Ok(state.delayed.len() as i64)
    }

    async fn delete(&self, queue_name: &str, receipt_handle: i64) -> MessagingResult<()> {
        self.state
            .lock()
            .unwrap()
            .deleted
            .push((queue_name.to_string(), receipt_handle));
        Ok(())
    }

    async fn read_batch(
        &self,
        _queue_name: &str,
        _visibility_timeout_secs: i32,
        _limit: i32,
    ) -> MessagingResult<Vec<InboundRecord>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Repository double

#[derive(Default)]
pub struct MockRepositoryState {
    pub archivos: HashMap<i64, Archivo>,
    pub estados: Vec<ArchivoEstado>,
    pub attempts: Vec<RtaProcesamiento>,
    pub sub_files: Vec<RtaProArchivo>,
    pub catalog: HashMap<String, CatalogoError>,
    pub next_archivo_id: i64,
}

#[derive(Default)]
pub struct MockRepository {
    pub state: Mutex<MockRepositoryState>,
}

impl MockRepository {
    pub fn new() -> Arc<Self> {
        let repo = Self::default();
        repo.state.lock().unwrap().next_archivo_id = 1;
        Arc::new(repo)
    }

    /// Seed the baseline error catalog the pipeline annotates with.
    pub fn seed_catalog(&self) {
        let entries = [
            ("RTA001", "Nombre de archivo invalido", false),
            ("RTA002", "Conteo de archivos inesperado", false),
            ("RTA003", "Sufijo de archivo invalido", false),
            ("RTA004", "Archivo comprimido corrupto", true),
            ("RTA005", "Registro no encontrado", false),
            ("RTA006", "Fallo tecnico de procesamiento", true),
        ];
        let mut state = self.state.lock().unwrap();
        for (codigo, descripcion, aplica) in entries {
            state.catalog.insert(
                codigo.to_string(),
                CatalogoError {
                    codigo: codigo.to_string(),
                    descripcion: descripcion.to_string(),
                    proceso: "rta".to_string(),
                    aplica_reprogramacion: aplica,
                },
            );
        }
    }

    pub fn archivo_by_nombre(&self, nombre: &str) -> Option<Archivo> {
        self.state
            .lock()
            .unwrap()
            .archivos
            .values()
            .find(|a| a.nombre_archivo == nombre)
            .cloned()
    }

    pub fn estado_of(&self, archivo_id: i64) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .archivos
            .get(&archivo_id)
            .and_then(|a| a.estado.clone())
    }

    pub fn attempts_for(&self, archivo_id: i64) -> Vec<RtaProcesamiento> {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|a| a.archivo_id == archivo_id)
            .cloned()
            .collect()
    }

    pub fn sub_files_for(&self, archivo_id: i64) -> Vec<RtaProArchivo> {
        self.state
            .lock()
            .unwrap()
            .sub_files
            .iter()
            .filter(|f| f.archivo_id == archivo_id)
            .cloned()
            .collect()
    }

    pub fn audit_rows_for(&self, archivo_id: i64) -> Vec<ArchivoEstado> {
        self.state
            .lock()
            .unwrap()
            .estados
            .iter()
            .filter(|e| e.archivo_id == archivo_id)
            .cloned()
            .collect()
    }

    /// Insert an archivo row directly, for scenarios that start mid-life.
    pub fn seed_archivo(&self, nombre: &str, tipo: &str, estado: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_archivo_id;
        state.next_archivo_id += 1;
        let now = Utc::now().naive_utc();
        state.archivos.insert(
            id,
            Archivo {
                id,
                nombre_archivo: nombre.to_string(),
                plataforma_origen: "TUTGMF".to_string(),
                tipo_archivo: tipo.to_string(),
                consecutivo_plataforma: None,
                fecha_nombre_archivo: None,
                fecha_recepcion: now,
                fecha_ciclo: None,
                contador_intentos_cargue: 0,
                contador_intentos_generacion: 0,
                contador_intentos_empaquetado: 0,
                estado: Some(estado.to_string()),
                codigo_error: None,
                detalle_error: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

#[async_trait]
impl ArchivoRepository for MockRepository {
    async fn find_archivo(&self, archivo_id: i64) -> Result<Option<Archivo>, sqlx::Error> {
        Ok(self.state.lock().unwrap().archivos.get(&archivo_id).cloned())
    }

    async fn find_archivo_by_nombre(
        &self,
        nombre_archivo: &str,
    ) -> Result<Option<Archivo>, sqlx::Error> {
        Ok(self.archivo_by_nombre(nombre_archivo))
    }

    async fn create_archivo(&self, nuevo: NewArchivo) -> Result<Archivo, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_archivo_id;
        state.next_archivo_id += 1;
        let now = Utc::now().naive_utc();
        let archivo = Archivo {
            id,
            nombre_archivo: nuevo.nombre_archivo,
            plataforma_origen: nuevo.plataforma_origen,
            tipo_archivo: nuevo.tipo_archivo,
            consecutivo_plataforma: nuevo.consecutivo_plataforma,
            fecha_nombre_archivo: nuevo.fecha_nombre_archivo,
            fecha_recepcion: now,
            fecha_ciclo: nuevo.fecha_ciclo,
            contador_intentos_cargue: 0,
            contador_intentos_generacion: 0,
            contador_intentos_empaquetado: 0,
            estado: Some(nuevo.estado),
            codigo_error: None,
            detalle_error: None,
            created_at: now,
            updated_at: now,
        };
        state.archivos.insert(id, archivo.clone());
        Ok(archivo)
    }

    async fn transition_archivo(
        &self,
        archivo_id: i64,
        estado_inicial: &str,
        estado_final: &str,
        fecha_cambio: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let archivo = state
            .archivos
            .get_mut(&archivo_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        archivo.estado = Some(estado_final.to_string());
        let next_id = state.estados.len() as i64 + 1;
        state.estados.push(ArchivoEstado {
            id: next_id,
            archivo_id,
            estado_inicial: estado_inicial.to_string(),
            estado_final: estado_final.to_string(),
            fecha_cambio_estado: fecha_cambio,
        });
        Ok(())
    }

    async fn record_archivo_error(
        &self,
        archivo_id: i64,
        codigo: &str,
        detalle: &str,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let archivo = state
            .archivos
            .get_mut(&archivo_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        archivo.codigo_error = Some(codigo.to_string());
        archivo.detalle_error = Some(detalle.to_string());
        Ok(())
    }

    async fn increment_intentos_cargue(&self, archivo_id: i64) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let archivo = state
            .archivos
            .get_mut(&archivo_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        archivo.contador_intentos_cargue += 1;
        Ok(())
    }

    async fn estado_history(&self, archivo_id: i64) -> Result<Vec<ArchivoEstado>, sqlx::Error> {
        Ok(self.audit_rows_for(archivo_id))
    }

    async fn create_attempt(
        &self,
        nuevo: NewRtaProcesamiento,
    ) -> Result<RtaProcesamiento, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let next_id = state
            .attempts
            .iter()
            .filter(|a| a.archivo_id == nuevo.archivo_id)
            .map(|a| a.id)
            .max()
            .unwrap_or(0)
            + 1;
        let attempt = RtaProcesamiento {
            archivo_id: nuevo.archivo_id,
            id: next_id,
            nombre_archivo_zip: nuevo.nombre_archivo_zip,
            tipo_respuesta: nuevo.tipo_respuesta,
            fecha_recepcion: Utc::now().naive_utc(),
            estado: nuevo.estado,
            contador_intentos: 0,
            codigo_error: None,
            detalle_error: None,
        };
        state.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn latest_attempt(
        &self,
        archivo_id: i64,
    ) -> Result<Option<RtaProcesamiento>, sqlx::Error> {
        Ok(self
            .attempts_for(archivo_id)
            .into_iter()
            .max_by_key(|a| a.id))
    }

    async fn update_attempt_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        estado: &str,
        codigo_error: Option<&str>,
        detalle_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let attempt = state
            .attempts
            .iter_mut()
            .find(|a| a.archivo_id == archivo_id && a.id == attempt_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        attempt.estado = estado.to_string();
        if let Some(codigo) = codigo_error {
            attempt.codigo_error = Some(codigo.to_string());
        }
        if let Some(detalle) = detalle_error {
            attempt.detalle_error = Some(detalle.to_string());
        }
        Ok(())
    }

    async fn increment_attempt_intentos(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(attempt) = state
            .attempts
            .iter_mut()
            .find(|a| a.archivo_id == archivo_id && a.id == attempt_id)
        {
            attempt.contador_intentos += 1;
        }
        Ok(())
    }

    async fn register_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        files: &[NewRtaProArchivo],
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let mut registered = Vec::with_capacity(files.len());
        for file in files {
            let row = RtaProArchivo {
                archivo_id,
                rta_procesamiento_id: attempt_id,
                nombre_archivo: file.nombre_archivo.clone(),
                tipo_archivo_rta: file.tipo_archivo_rta.clone(),
                ruta_archivo: file.ruta_archivo.clone(),
                estado: file.estado.clone(),
                contador_intentos: 0,
                codigo_error: None,
                detalle_error: None,
                created_at: Utc::now().naive_utc(),
            };
            state.sub_files.push(row.clone());
            registered.push(row);
        }
        Ok(registered)
    }

    async fn update_sub_file_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        nombre_archivo: &str,
        estado: &str,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .sub_files
            .iter_mut()
            .find(|f| {
                f.archivo_id == archivo_id
                    && f.rta_procesamiento_id == attempt_id
                    && f.nombre_archivo == nombre_archivo
            })
            .ok_or(sqlx::Error::RowNotFound)?;
        row.estado = estado.to_string();
        Ok(())
    }

    async fn pending_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        Ok(self
            .sub_files_for(archivo_id)
            .into_iter()
            .filter(|f| f.rta_procesamiento_id == attempt_id && f.estado == "PENDIENTE_INICIO")
            .collect())
    }

    async fn find_catalog_error(
        &self,
        codigo: &str,
    ) -> Result<Option<CatalogoError>, sqlx::Error> {
        Ok(self.state.lock().unwrap().catalog.get(codigo).cloned())
    }
}

// ---------------------------------------------------------------------------
// Notifier double

#[derive(Default)]
pub struct MockNotifier {
    pub templates: Mutex<HashMap<String, EmailTemplate>>,
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl MockNotifier {
    pub fn new() -> Arc<Self> {
        let notifier = Self::default();
        let mut templates = HashMap::new();
        for id in ["fallo_tecnico", "rechazo_estructural"] {
            templates.insert(
                id.to_string(),
                EmailTemplate {
                    id: id.to_string(),
                    asunto: format!("Notificacion {id}"),
                    cuerpo: "{nombre_archivo}: {descripcion_error}".to_string(),
                    parametros: vec![
                        "nombre_archivo".to_string(),
                        "codigo_error".to_string(),
                        "descripcion_error".to_string(),
                    ],
                    destinatarios: vec!["operaciones@example.com".to_string()],
                },
            );
        }
        *notifier.templates.lock().unwrap() = templates;
        Arc::new(notifier)
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn drop_template(&self, id: &str) {
        self.templates.lock().unwrap().remove(id);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn lookup_template(&self, template_id: &str) -> Option<EmailTemplate> {
        self.templates.lock().unwrap().get(template_id).cloned()
    }

    async fn enqueue(&self, message: EmailMessage) -> MessagingResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness

pub struct TestHarness {
    pub processor: IngestionProcessor,
    pub storage: Arc<MockObjectStore>,
    pub queue: Arc<MockQueueClient>,
    pub repository: Arc<MockRepository>,
    pub notifier: Arc<MockNotifier>,
    pub config: RtaConfig,
}

pub fn harness() -> TestHarness {
    harness_with_config(RtaConfig::default())
}

pub fn harness_with_config(config: RtaConfig) -> TestHarness {
    let storage = MockObjectStore::new();
    let queue = MockQueueClient::new();
    let repository = MockRepository::new();
    repository.seed_catalog();
    let notifier = MockNotifier::new();

    let grammar = NameGrammar::new(&config.naming).expect("grammar must compile");
    let rules = ManifestRules::new(&config.manifiestos, &config.naming);
    let state_machine = Arc::new(ArchivoStateMachine::new(
        repository.clone() as Arc<dyn ArchivoRepository>,
        &config.states.validos,
    ));
    let escalation = Arc::new(ErrorEscalationService::new(
        storage.clone(),
        queue.clone(),
        repository.clone(),
        notifier.clone(),
        &config.storage,
        config.queues.entrada.clone(),
    ));
    let retry = RetryCoordinator::new(
        state_machine.clone(),
        repository.clone(),
        queue.clone(),
        escalation.clone(),
        config.retry.respuesta.clone(),
        config.queues.entrada.clone(),
        config.notificaciones.template_fallo_tecnico.clone(),
    );
    let processor = IngestionProcessor::new(
        grammar,
        ZipContentValidator::new(rules),
        repository.clone(),
        storage.clone(),
        queue.clone(),
        state_machine,
        retry,
        escalation,
        ProcessorSettings::from_config(&config),
    );

    TestHarness {
        processor,
        storage,
        queue,
        repository,
        notifier,
        config,
    }
}

// ---------------------------------------------------------------------------
// Fixtures

pub const SPECIAL_ZIP: &str = "RE_ESP_TUTGMF0001003920241002-0001.zip";
pub const SPECIAL_BASE: &str = "TUTGMF0001003920241002-0001";
pub const GENERAL_ZIP: &str = "RE_GEN_TUTGMF0001003920241002-0004.zip";
pub const GENERAL_BASE: &str = "TUTGMF0001003920241002-0004";

/// Build an in-memory zip with the given entry names.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        for (name, contents) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

/// The valid three-file interior for a response-type "01" attempt.
pub fn valid_interior(base: &str) -> Vec<u8> {
    let names: Vec<String> = ["01", "02", "03"]
        .iter()
        .map(|s| format!("RE_{base}-{s}.txt"))
        .collect();
    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .map(|n| (n.as_str(), b"contenido".as_slice()))
        .collect();
    build_zip(&entries)
}

/// Inbound record for a seeded object.
pub fn record_for(bucket: &str, key: &str, receipt_handle: i64) -> InboundRecord {
    InboundRecord {
        receipt_handle,
        body: serde_json::json!({ "bucket": bucket, "key": key }).to_string(),
    }
}

/// Inbound record for a redelivered message carrying retry bookkeeping.
pub fn retry_record_for(
    bucket: &str,
    key: &str,
    receipt_handle: i64,
    retry_count: u32,
) -> InboundRecord {
    InboundRecord {
        receipt_handle,
        body: serde_json::json!({
            "bucket": bucket,
            "key": key,
            "retry_count": retry_count,
            "is_reprocessing": retry_count > 0,
        })
        .to_string(),
    }
}
