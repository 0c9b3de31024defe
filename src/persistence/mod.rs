//! # Persistence Layer
//!
//! Repository seam over the five entities. Components depend on the
//! [`ArchivoRepository`] trait, never on `PgPool` directly, so the
//! orchestration flow is testable against in-memory doubles and the
//! production implementation stays a thin delegation to the models, which
//! own their SQL.

pub mod postgres;

use crate::models::{
    Archivo, ArchivoEstado, CatalogoError, NewArchivo, NewRtaProArchivo, NewRtaProcesamiento,
    RtaProArchivo, RtaProcesamiento,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use postgres::PgArchivoRepository;

/// CRUD plus the atomic mutation groups the orchestration flow needs.
#[async_trait]
pub trait ArchivoRepository: Send + Sync {
    async fn find_archivo(&self, archivo_id: i64) -> Result<Option<Archivo>, sqlx::Error>;

    async fn find_archivo_by_nombre(
        &self,
        nombre_archivo: &str,
    ) -> Result<Option<Archivo>, sqlx::Error>;

    async fn create_archivo(&self, nuevo: NewArchivo) -> Result<Archivo, sqlx::Error>;

    /// Atomic estado update + audit row. `RowNotFound` when the archivo
    /// does not exist.
    async fn transition_archivo(
        &self,
        archivo_id: i64,
        estado_inicial: &str,
        estado_final: &str,
        fecha_cambio: NaiveDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn record_archivo_error(
        &self,
        archivo_id: i64,
        codigo: &str,
        detalle: &str,
    ) -> Result<(), sqlx::Error>;

    /// Bump the archivo-level load retry counter.
    async fn increment_intentos_cargue(&self, archivo_id: i64) -> Result<(), sqlx::Error>;

    async fn estado_history(&self, archivo_id: i64) -> Result<Vec<ArchivoEstado>, sqlx::Error>;

    async fn create_attempt(
        &self,
        nuevo: NewRtaProcesamiento,
    ) -> Result<RtaProcesamiento, sqlx::Error>;

    /// The current attempt: highest attempt id for the archivo.
    async fn latest_attempt(
        &self,
        archivo_id: i64,
    ) -> Result<Option<RtaProcesamiento>, sqlx::Error>;

    async fn update_attempt_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        estado: &str,
        codigo_error: Option<&str>,
        detalle_error: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    async fn increment_attempt_intentos(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<(), sqlx::Error>;

    /// All-or-nothing registration of one attempt's validated contents.
    async fn register_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        files: &[NewRtaProArchivo],
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error>;

    async fn update_sub_file_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        nombre_archivo: &str,
        estado: &str,
    ) -> Result<(), sqlx::Error>;

    /// Sub-files of one attempt still in `PENDIENTE_INICIO`.
    async fn pending_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error>;

    async fn find_catalog_error(
        &self,
        codigo: &str,
    ) -> Result<Option<CatalogoError>, sqlx::Error>;
}
