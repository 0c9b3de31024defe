//! # Archivo Estado Model
//!
//! Append-only audit log of archivo state transitions. Rows are written
//! once, inside the same transaction as the owning archivo's `estado`
//! update, and never mutated afterwards. There is no update method on
//! purpose.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ArchivoEstado {
    pub id: i64,
    pub archivo_id: i64,
    pub estado_inicial: String,
    pub estado_final: String,
    pub fecha_cambio_estado: NaiveDateTime,
}

impl ArchivoEstado {
    /// Transition history for one archivo, oldest first.
    pub async fn history(
        pool: &PgPool,
        archivo_id: i64,
    ) -> Result<Vec<ArchivoEstado>, sqlx::Error> {
        sqlx::query_as::<_, ArchivoEstado>(
            r#"
            SELECT * FROM archivo_estados
            WHERE archivo_id = $1
            ORDER BY fecha_cambio_estado ASC, id ASC
            "#,
        )
        .bind(archivo_id)
        .fetch_all(pool)
        .await
    }
}
