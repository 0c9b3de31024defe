use serde::{Deserialize, Serialize};
use std::fmt;

/// Archivo lifecycle states. The persisted tokens are the Spanish
/// SCREAMING_SNAKE literals the platform's valid-state catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchivoState {
    /// Initial state when the file is first recognized
    Iniciado,
    /// A processing attempt is loading the zip contents
    CargandoRtaProcesamiento,
    /// Terminal success: contents validated, registered and dispatched
    Procesado,
    /// Terminal rejection on structural grounds
    ProcesamientoRechazado,
    /// Waiting for a delayed redelivery after a technical failure
    ProcesaPendienteReintento,
    /// Terminal failure after retries were exhausted
    ProcesamientoFallido,
}

impl ArchivoState {
    /// Every state the fixed transition policy references. Configuration
    /// may extend the valid-state vocabulary but must include these.
    pub fn all() -> &'static [ArchivoState] {
        &[
            Self::Iniciado,
            Self::CargandoRtaProcesamiento,
            Self::Procesado,
            Self::ProcesamientoRechazado,
            Self::ProcesaPendienteReintento,
            Self::ProcesamientoFallido,
        ]
    }

    /// Terminal success marker. Used to suppress error notifications for
    /// files that already completed.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Procesado)
    }

    /// Check if this state ends a processing cycle. Failure terminals can
    /// still re-enter loading when a corrected file arrives.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Procesado | Self::ProcesamientoRechazado | Self::ProcesamientoFallido
        )
    }

    /// Anything short of terminal success may still be retried.
    pub fn is_retry_eligible(&self) -> bool {
        !self.is_terminal_success()
    }
}

impl fmt::Display for ArchivoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Iniciado => "INICIADO",
            Self::CargandoRtaProcesamiento => "CARGANDO_RTA_PROCESAMIENTO",
            Self::Procesado => "PROCESADO",
            Self::ProcesamientoRechazado => "PROCESAMIENTO_RECHAZADO",
            Self::ProcesaPendienteReintento => "PROCESA_PENDIENTE_REINTENTO",
            Self::ProcesamientoFallido => "PROCESAMIENTO_FALLIDO",
        };
        write!(f, "{token}")
    }
}

impl std::str::FromStr for ArchivoState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INICIADO" => Ok(Self::Iniciado),
            "CARGANDO_RTA_PROCESAMIENTO" => Ok(Self::CargandoRtaProcesamiento),
            "PROCESADO" => Ok(Self::Procesado),
            "PROCESAMIENTO_RECHAZADO" => Ok(Self::ProcesamientoRechazado),
            "PROCESA_PENDIENTE_REINTENTO" => Ok(Self::ProcesaPendienteReintento),
            "PROCESAMIENTO_FALLIDO" => Ok(Self::ProcesamientoFallido),
            _ => Err(format!("Invalid archivo state: {s}")),
        }
    }
}

impl Default for ArchivoState {
    fn default() -> Self {
        Self::Iniciado
    }
}

/// Per-extracted-file dispatch states within one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RtaProArchivoState {
    /// Registered, follow-up message not yet enqueued
    PendienteInicio,
    /// Follow-up message enqueued downstream
    Enviado,
    /// Dispatch permanently failed
    Fallido,
}

impl RtaProArchivoState {
    /// Eligible for the send-pending sweep.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendienteInicio)
    }
}

impl fmt::Display for RtaProArchivoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::PendienteInicio => "PENDIENTE_INICIO",
            Self::Enviado => "ENVIADO",
            Self::Fallido => "FALLIDO",
        };
        write!(f, "{token}")
    }
}

impl std::str::FromStr for RtaProArchivoState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDIENTE_INICIO" => Ok(Self::PendienteInicio),
            "ENVIADO" => Ok(Self::Enviado),
            "FALLIDO" => Ok(Self::Fallido),
            _ => Err(format!("Invalid rta_pro_archivo state: {s}")),
        }
    }
}

impl Default for RtaProArchivoState {
    fn default() -> Self {
        Self::PendienteInicio
    }
}
