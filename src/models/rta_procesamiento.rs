//! # RtaProcesamiento Model
//!
//! One row per decompression/processing attempt against an archivo. The
//! key is composite (`archivo_id`, `id`) where `id` is a per-archivo
//! auto-increment assigned inside the creating transaction; "the current
//! attempt" is always the row with the highest `id` for its archivo.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// One processing attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RtaProcesamiento {
    pub archivo_id: i64,
    /// Per-archivo attempt number, assigned sequentially
    pub id: i64,
    pub nombre_archivo_zip: String,
    pub tipo_respuesta: String,
    pub fecha_recepcion: NaiveDateTime,
    pub estado: String,
    pub contador_intentos: i32,
    pub codigo_error: Option<String>,
    pub detalle_error: Option<String>,
}

/// New attempt for creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRtaProcesamiento {
    pub archivo_id: i64,
    pub nombre_archivo_zip: String,
    pub tipo_respuesta: String,
    pub estado: String,
}

impl RtaProcesamiento {
    /// Create the next attempt for an archivo.
    ///
    /// The attempt id is `MAX(id) + 1` for the archivo, computed and
    /// inserted in one transaction so concurrent creations cannot collide
    /// on the composite key without one of them failing and retrying.
    pub async fn create(
        pool: &PgPool,
        nuevo: NewRtaProcesamiento,
    ) -> Result<RtaProcesamiento, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let next_id: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(id), 0) + 1
            FROM rta_procesamiento
            WHERE archivo_id = $1
            "#,
        )
        .bind(nuevo.archivo_id)
        .fetch_one(&mut *tx)
        .await?;

        let attempt = sqlx::query_as::<_, RtaProcesamiento>(
            r#"
            INSERT INTO rta_procesamiento
            (archivo_id, id, nombre_archivo_zip, tipo_respuesta,
             fecha_recepcion, estado, contador_intentos)
            VALUES ($1, $2, $3, $4, NOW(), $5, 0)
            RETURNING *
            "#,
        )
        .bind(nuevo.archivo_id)
        .bind(next_id)
        .bind(&nuevo.nombre_archivo_zip)
        .bind(&nuevo.tipo_respuesta)
        .bind(&nuevo.estado)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(attempt)
    }

    /// The current attempt: highest attempt id for the archivo.
    pub async fn latest(
        pool: &PgPool,
        archivo_id: i64,
    ) -> Result<Option<RtaProcesamiento>, sqlx::Error> {
        sqlx::query_as::<_, RtaProcesamiento>(
            r#"
            SELECT * FROM rta_procesamiento
            WHERE archivo_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(archivo_id)
        .fetch_optional(pool)
        .await
    }

    /// Update an attempt's estado, optionally annotating an error.
    pub async fn update_estado(
        pool: &PgPool,
        archivo_id: i64,
        id: i64,
        estado: &str,
        codigo_error: Option<&str>,
        detalle_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE rta_procesamiento
            SET estado = $3,
                codigo_error = COALESCE($4, codigo_error),
                detalle_error = COALESCE($5, detalle_error)
            WHERE archivo_id = $1 AND id = $2
            "#,
        )
        .bind(archivo_id)
        .bind(id)
        .bind(estado)
        .bind(codigo_error)
        .bind(detalle_error)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Increment the attempt's retry counter.
    pub async fn increment_intentos(
        pool: &PgPool,
        archivo_id: i64,
        id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE rta_procesamiento
            SET contador_intentos = contador_intentos + 1
            WHERE archivo_id = $1 AND id = $2
            "#,
        )
        .bind(archivo_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
