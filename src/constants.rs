//! # System Constants
//!
//! Core constants and small enums that define the operational boundaries of
//! the response-file ingestion system: catalog error codes, queue names,
//! retry defaults, and the file-family / response-type vocabulary shared by
//! the naming, validation and orchestration layers.

use serde::{Deserialize, Serialize};

// Re-export state types for convenience
pub use crate::state_machine::{ArchivoState, RtaProArchivoState};

/// Catalog error codes persisted on rejected or failed archivos.
///
/// Codes are resolved against the `catalogo_errores` table at escalation
/// time; the description stored there drives the notification body.
pub mod error_codes {
    /// Filename matches neither the special nor the general grammar.
    pub const NOMBRE_INVALIDO: &str = "RTA001";
    /// Zip entry count does not match the manifest for the response type.
    pub const CONTEO_INESPERADO: &str = "RTA002";
    /// A zip entry name carries a suffix outside the allowed set.
    pub const SUFIJO_INVALIDO: &str = "RTA003";
    /// The compressed payload could not be opened or read.
    pub const ARCHIVO_CORRUPTO: &str = "RTA004";
    /// A mandatory database record was absent.
    pub const REGISTRO_NO_ENCONTRADO: &str = "RTA005";
    /// Connectivity or infrastructure failure while processing.
    pub const FALLO_TECNICO: &str = "RTA006";
}

/// Estado tokens for `rta_procesamiento` attempt rows.
pub mod attempt_states {
    /// Attempt registered, contents being loaded.
    pub const EN_PROCESO: &str = "EN_PROCESO";
    /// Contents validated, registered and dispatched.
    pub const PROCESADO: &str = "PROCESADO";
    /// Structural rejection of the attempt's contents.
    pub const RECHAZADO: &str = "RECHAZADO";
    /// Terminal failure after retries were exhausted.
    pub const FALLIDO: &str = "FALLIDO";
}

/// Queue names used by the ingestion pipeline.
pub mod queues {
    /// Object-store event notifications (one message per stored file).
    pub const ENTRADA_RTA: &str = "entrada_rta";
    /// Per-entry dispatch of validated zip contents to downstream consumers.
    pub const SALIDA_RTA: &str = "salida_rta";
}

/// Default operational tunables, overridable through configuration.
pub mod defaults {
    /// Maximum technical-failure attempts before escalation.
    pub const MAX_RETRIES: u32 = 3;
    /// Delay in seconds before a technical retry becomes visible again.
    pub const RETRY_DELAY_SECONDS: u64 = 300;
    /// Messages pulled from the inbound queue per poll.
    pub const BATCH_SIZE: i32 = 10;
    /// Visibility timeout in seconds for in-flight messages.
    pub const VISIBILITY_TIMEOUT_SECONDS: i32 = 600;
    /// Idle wait in milliseconds when the inbound queue is empty.
    pub const POLL_INTERVAL_MS: u64 = 5000;
}

/// File family derived from the name grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFamily {
    Especial,
    General,
    GeneralReintegro,
}

impl FileFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFamily::Especial => "ESPECIAL",
            FileFamily::General => "GENERAL",
            FileFamily::GeneralReintegro => "GENERAL_REINTEGRO",
        }
    }

    /// Whether a missing platform record may be created on the fly.
    ///
    /// Special files originate outside the platform, so their consecutivo
    /// record is created when absent; for general families an absent record
    /// is an inconsistency.
    pub fn allows_record_creation(&self) -> bool {
        matches!(self, FileFamily::Especial)
    }
}

impl std::fmt::Display for FileFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FileFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ESPECIAL" => Ok(FileFamily::Especial),
            "GENERAL" => Ok(FileFamily::General),
            "GENERAL_REINTEGRO" => Ok(FileFamily::GeneralReintegro),
            other => Err(format!("Invalid file family: {other}")),
        }
    }
}
