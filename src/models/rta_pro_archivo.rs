//! # RtaProArchivo Model
//!
//! One row per file extracted from a zip during one attempt, keyed by
//! (`archivo_id`, `rta_procesamiento_id`, `nombre_archivo`). Rows start in
//! `PENDIENTE_INICIO` and flip to `ENVIADO` only after their follow-up
//! message is on the downstream queue; a pending row that survives is the
//! input of the send-pending sweep.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// One extracted interior file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RtaProArchivo {
    pub archivo_id: i64,
    pub rta_procesamiento_id: i64,
    pub nombre_archivo: String,
    /// Response sub-type suffix from the interior filename
    pub tipo_archivo_rta: String,
    /// Object-store key the content was uploaded under; the send-pending
    /// sweep replays the follow-up message from this column
    pub ruta_archivo: String,
    pub estado: String,
    pub contador_intentos: i32,
    pub codigo_error: Option<String>,
    pub detalle_error: Option<String>,
    pub created_at: NaiveDateTime,
}

/// New sub-file row for registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRtaProArchivo {
    pub nombre_archivo: String,
    pub tipo_archivo_rta: String,
    pub ruta_archivo: String,
    pub estado: String,
}

impl RtaProArchivo {
    /// Register the validated contents of one attempt in a single
    /// transaction: either every row commits or none does, so a partial
    /// registration can never be observed downstream.
    pub async fn register_all(
        pool: &PgPool,
        archivo_id: i64,
        rta_procesamiento_id: i64,
        files: &[NewRtaProArchivo],
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut registered = Vec::with_capacity(files.len());

        for file in files {
            let row = sqlx::query_as::<_, RtaProArchivo>(
                r#"
                INSERT INTO rta_pro_archivos
                (archivo_id, rta_procesamiento_id, nombre_archivo,
                 tipo_archivo_rta, ruta_archivo, estado, contador_intentos, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, 0, NOW())
                RETURNING *
                "#,
            )
            .bind(archivo_id)
            .bind(rta_procesamiento_id)
            .bind(&file.nombre_archivo)
            .bind(&file.tipo_archivo_rta)
            .bind(&file.ruta_archivo)
            .bind(&file.estado)
            .fetch_one(&mut *tx)
            .await?;
            registered.push(row);
        }

        tx.commit().await?;
        Ok(registered)
    }

    /// Flip one sub-file to a new estado after its dispatch outcome.
    pub async fn update_estado(
        pool: &PgPool,
        archivo_id: i64,
        rta_procesamiento_id: i64,
        nombre_archivo: &str,
        estado: &str,
    ) -> Result<(), sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE rta_pro_archivos
            SET estado = $4
            WHERE archivo_id = $1 AND rta_procesamiento_id = $2 AND nombre_archivo = $3
            "#,
        )
        .bind(archivo_id)
        .bind(rta_procesamiento_id)
        .bind(nombre_archivo)
        .bind(estado)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Sub-files of one attempt still waiting for dispatch.
    pub async fn pending_for_attempt(
        pool: &PgPool,
        archivo_id: i64,
        rta_procesamiento_id: i64,
    ) -> Result<Vec<RtaProArchivo>, sqlx::Error> {
        sqlx::query_as::<_, RtaProArchivo>(
            r#"
            SELECT * FROM rta_pro_archivos
            WHERE archivo_id = $1
              AND rta_procesamiento_id = $2
              AND estado = 'PENDIENTE_INICIO'
            ORDER BY nombre_archivo ASC
            "#,
        )
        .bind(archivo_id)
        .bind(rta_procesamiento_id)
        .fetch_all(pool)
        .await
    }
}
