//! Postgres-backed repository. Pure delegation; the models own the SQL and
//! the transaction boundaries.

use super::ArchivoRepository;
use crate::models::{
    Archivo, ArchivoEstado, CatalogoError, NewArchivo, NewRtaProArchivo, NewRtaProcesamiento,
    RtaProArchivo, RtaProcesamiento,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgArchivoRepository {
    pool: PgPool,
}

impl PgArchivoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ArchivoRepository for PgArchivoRepository {
    async fn find_archivo(&self, archivo_id: i64) -> Result<Option<Archivo>, sqlx::Error> {
        Archivo::find_by_id(&self.pool, archivo_id).await
    }

    async fn find_archivo_by_nombre(
        &self,
        nombre_archivo: &str,
    ) -> Result<Option<Archivo>, sqlx::Error> {
        Archivo::find_by_nombre(&self.pool, nombre_archivo).await
    }

    async fn create_archivo(&self, nuevo: NewArchivo) -> Result<Archivo, sqlx::Error> {
        Archivo::create(&self.pool, nuevo).await
    }

    async fn transition_archivo(
        &self,
        archivo_id: i64,
        estado_inicial: &str,
        estado_final: &str,
        fecha_cambio: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        Archivo::transition(&self.pool, archivo_id, estado_inicial, estado_final, fecha_cambio)
            .await
    }

    async fn record_archivo_error(
        &self,
        archivo_id: i64,
        codigo: &str,
        detalle: &str,
    ) -> Result<(), sqlx::Error> {
        Archivo::record_error(&self.pool, archivo_id, codigo, detalle).await
    }

    async fn increment_intentos_cargue(&self, archivo_id: i64) -> Result<(), sqlx::Error> {
        Archivo::increment_intentos_cargue(&self.pool, archivo_id).await
    }

    async fn estado_history(&self, archivo_id: i64) -> Result<Vec<ArchivoEstado>, sqlx::Error> {
        ArchivoEstado::history(&self.pool, archivo_id).await
    }

    async fn create_attempt(
        &self,
        nuevo: NewRtaProcesamiento,
    ) -> Result<RtaProcesamiento, sqlx::Error> {
        RtaProcesamiento::create(&self.pool, nuevo).await
    }

    async fn latest_attempt(
        &self,
        archivo_id: i64,
    ) -> Result<Option<RtaProcesamiento>, sqlx::Error> {
        RtaProcesamiento::latest(&self.pool, archivo_id).await
    }

    async fn update_attempt_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        estado: &str,
        codigo_error: Option<&str>,
        detalle_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        RtaProcesamiento::update_estado(
            &self.pool,
            archivo_id,
            attempt_id,
            estado,
            codigo_error,
            detalle_error,
        )
        .await
    }

    async fn increment_attempt_intentos(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<(), sqlx::Error> {
        RtaProcesamiento::increment_intentos(&self.pool, archivo_id, attempt_id).await
    }

    async fn register_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        files: &[NewRtaProArchivo],
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        RtaProArchivo::register_all(&self.pool, archivo_id, attempt_id, files).await
    }

    async fn update_sub_file_estado(
        &self,
        archivo_id: i64,
        attempt_id: i64,
        nombre_archivo: &str,
        estado: &str,
    ) -> Result<(), sqlx::Error> {
        RtaProArchivo::update_estado(&self.pool, archivo_id, attempt_id, nombre_archivo, estado)
            .await
    }

    async fn pending_sub_files(
        &self,
        archivo_id: i64,
        attempt_id: i64,
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        RtaProArchivo::pending_for_attempt(&self.pool, archivo_id, attempt_id).await
    }

    async fn find_catalog_error(
        &self,
        codigo: &str,
    ) -> Result<Option<CatalogoError>, sqlx::Error> {
        CatalogoError::find_by_codigo(&self.pool, codigo).await
    }
}
