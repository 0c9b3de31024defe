//! # Data Models
//!
//! sqlx-backed entities for the ingestion core. Each model owns its SQL:
//! `FromRow` structs plus create/find/update methods over a `PgPool`, using
//! the runtime query API with bound parameters. Mutation groups that must
//! never be observed partially (state transition + audit row, attempt
//! registration + sub-file rows) run inside explicit transactions.
//!
//! Tables: `archivos`, `archivo_estados`, `rta_procesamiento`,
//! `rta_pro_archivos`, `catalogo_errores`.

pub mod archivo;
pub mod archivo_estado;
pub mod catalogo_error;
pub mod rta_pro_archivo;
pub mod rta_procesamiento;

pub use archivo::{Archivo, NewArchivo};
pub use archivo_estado::ArchivoEstado;
pub use catalogo_error::CatalogoError;
pub use rta_pro_archivo::{NewRtaProArchivo, RtaProArchivo};
pub use rta_procesamiento::{NewRtaProcesamiento, RtaProcesamiento};
