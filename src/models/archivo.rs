//! # Archivo Model
//!
//! One row per logical response file, tracked end-to-end. The `estado`
//! column is free text validated against the configured allow-list by the
//! state machine layer; rows are never deleted, terminal states are final
//! markers. Every estado mutation goes through [`Archivo::transition`],
//! which writes the new value and the corresponding `archivo_estados`
//! audit row in one transaction.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Logical response file record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Archivo {
    pub id: i64,
    /// Canonical name: family prefix and `.zip` extension stripped
    pub nombre_archivo: String,
    pub plataforma_origen: String,
    /// Family token: ESPECIAL, GENERAL or GENERAL_REINTEGRO
    pub tipo_archivo: String,
    pub consecutivo_plataforma: Option<String>,
    pub fecha_nombre_archivo: Option<NaiveDate>,
    pub fecha_recepcion: NaiveDateTime,
    pub fecha_ciclo: Option<NaiveDate>,
    pub contador_intentos_cargue: i32,
    pub contador_intentos_generacion: i32,
    pub contador_intentos_empaquetado: i32,
    /// Null here is an unrecoverable inconsistency, surfaced by the state
    /// machine as a fatal error
    pub estado: Option<String>,
    pub codigo_error: Option<String>,
    pub detalle_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// New archivo for creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArchivo {
    pub nombre_archivo: String,
    pub plataforma_origen: String,
    pub tipo_archivo: String,
    pub consecutivo_plataforma: Option<String>,
    pub fecha_nombre_archivo: Option<NaiveDate>,
    pub fecha_ciclo: Option<NaiveDate>,
    pub estado: String,
}

impl Archivo {
    /// Insert a newly recognized file.
    pub async fn create(pool: &PgPool, nuevo: NewArchivo) -> Result<Archivo, sqlx::Error> {
        sqlx::query_as::<_, Archivo>(
            r#"
            INSERT INTO archivos
            (nombre_archivo, plataforma_origen, tipo_archivo, consecutivo_plataforma,
             fecha_nombre_archivo, fecha_recepcion, fecha_ciclo,
             contador_intentos_cargue, contador_intentos_generacion,
             contador_intentos_empaquetado, estado, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6, 0, 0, 0, $7, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre_archivo)
        .bind(&nuevo.plataforma_origen)
        .bind(&nuevo.tipo_archivo)
        .bind(&nuevo.consecutivo_plataforma)
        .bind(nuevo.fecha_nombre_archivo)
        .bind(nuevo.fecha_ciclo)
        .bind(&nuevo.estado)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Archivo>, sqlx::Error> {
        sqlx::query_as::<_, Archivo>("SELECT * FROM archivos WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lookup by canonical name. Names are unique per platform file, so at
    /// most one row matches.
    pub async fn find_by_nombre(
        pool: &PgPool,
        nombre_archivo: &str,
    ) -> Result<Option<Archivo>, sqlx::Error> {
        sqlx::query_as::<_, Archivo>("SELECT * FROM archivos WHERE nombre_archivo = $1")
            .bind(nombre_archivo)
            .fetch_optional(pool)
            .await
    }

    /// Atomic state transition: update `estado` and append the audit row in
    /// one transaction. Returns `RowNotFound` if the archivo vanished,
    /// which callers treat as fatal.
    pub async fn transition(
        pool: &PgPool,
        archivo_id: i64,
        estado_inicial: &str,
        estado_final: &str,
        fecha_cambio: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE archivos SET estado = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(archivo_id)
        .bind(estado_final)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        sqlx::query(
            r#"
            INSERT INTO archivo_estados
            (archivo_id, estado_inicial, estado_final, fecha_cambio_estado)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(archivo_id)
        .bind(estado_inicial)
        .bind(estado_final)
        .bind(fecha_cambio)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// Attach an error annotation without changing state.
    pub async fn record_error(
        pool: &PgPool,
        archivo_id: i64,
        codigo_error: &str,
        detalle_error: &str,
    ) -> Result<(), sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE archivos
            SET codigo_error = $2, detalle_error = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(archivo_id)
        .bind(codigo_error)
        .bind(detalle_error)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Increment the load-stage retry counter.
    pub async fn increment_intentos_cargue(
        pool: &PgPool,
        archivo_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE archivos
            SET contador_intentos_cargue = contador_intentos_cargue + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(archivo_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
