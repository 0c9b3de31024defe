//! # Error Catalog Model
//!
//! Static reference data describing every error code the pipeline can
//! annotate or notify about. Read-only from the core's perspective.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CatalogoError {
    pub codigo: String,
    pub descripcion: String,
    /// Owning process the error belongs to
    pub proceso: String,
    /// Whether the error is eligible for automatic reprogramming
    pub aplica_reprogramacion: bool,
}

impl CatalogoError {
    pub async fn find_by_codigo(
        pool: &PgPool,
        codigo: &str,
    ) -> Result<Option<CatalogoError>, sqlx::Error> {
        sqlx::query_as::<_, CatalogoError>("SELECT * FROM catalogo_errores WHERE codigo = $1")
            .bind(codigo)
            .fetch_optional(pool)
            .await
    }
}
