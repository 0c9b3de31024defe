//! # Zip Content Validator
//!
//! Pure predicate over the extracted listing of one attempt. The count
//! must equal the manifest's expected count, and every interior name must
//! carry the fixed `RE_` head, contain the canonical archivo base name,
//! and end with an allowed `-{sufijo}.txt` tail. The first bad name
//! invalidates the whole attempt; nothing is uploaded or registered on any
//! failure here. Side effects belong to the orchestrator.

use crate::manifest::{Manifest, ManifestRules};
use thiserror::Error;

/// Fixed head every interior response file carries.
const INTERIOR_PREFIX: &str = "RE_";
/// Extension every interior response file carries.
const INTERIOR_EXTENSION: &str = ".txt";

/// Why a listing failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZipValidationError {
    #[error("Archive holds {found} files, manifest for type '{tipo_respuesta}' expects {expected}")]
    UnexpectedFileCount {
        tipo_respuesta: String,
        expected: usize,
        found: usize,
    },

    #[error("Interior file '{nombre}' does not match the manifest naming rules")]
    InvalidFileSuffix { nombre: String },

    #[error("No manifest configured for response type '{tipo_respuesta}'")]
    UnknownResponseType { tipo_respuesta: String },
}

impl ZipValidationError {
    /// Catalog code this failure escalates with. An unknown response type
    /// has no code on purpose: it is a configuration failure, not an
    /// escalation.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::UnexpectedFileCount { .. } => {
                Some(crate::constants::error_codes::CONTEO_INESPERADO)
            }
            Self::InvalidFileSuffix { .. } => Some(crate::constants::error_codes::SUFIJO_INVALIDO),
            Self::UnknownResponseType { .. } => None,
        }
    }
}

/// Validator bound to the configured manifest rules.
#[derive(Debug, Clone)]
pub struct ZipContentValidator {
    rules: ManifestRules,
}

impl ZipContentValidator {
    pub fn new(rules: ManifestRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ManifestRules {
        &self.rules
    }

    /// Validate an extracted listing against the manifest for
    /// `tipo_respuesta`. `base_name` is the canonical archivo name
    /// (prefix and extension stripped).
    pub fn validate_contents(
        &self,
        tipo_respuesta: &str,
        base_name: &str,
        nombres: &[String],
    ) -> Result<(), ZipValidationError> {
        let manifest = self.rules.expected_manifest(tipo_respuesta).ok_or_else(|| {
            ZipValidationError::UnknownResponseType {
                tipo_respuesta: tipo_respuesta.to_string(),
            }
        })?;

        if nombres.len() != manifest.cantidad {
            return Err(ZipValidationError::UnexpectedFileCount {
                tipo_respuesta: tipo_respuesta.to_string(),
                expected: manifest.cantidad,
                found: nombres.len(),
            });
        }

        for nombre in nombres {
            if !Self::name_matches(manifest, base_name, nombre) {
                return Err(ZipValidationError::InvalidFileSuffix {
                    nombre: nombre.clone(),
                });
            }
        }

        Ok(())
    }

    /// Suffix token of a valid interior name, for persistence as the
    /// sub-file's response sub-type. Returns `None` for names that would
    /// not have validated.
    pub fn extract_suffix<'a>(manifest: &'a Manifest, nombre: &str) -> Option<&'a str> {
        let stem = nombre.strip_suffix(INTERIOR_EXTENSION)?;
        manifest
            .sufijos
            .iter()
            .find(|sufijo| stem.ends_with(&format!("-{sufijo}")))
            .map(|s| s.as_str())
    }

    fn name_matches(manifest: &Manifest, base_name: &str, nombre: &str) -> bool {
        if !nombre.starts_with(INTERIOR_PREFIX) {
            return false;
        }
        if !nombre.contains(base_name) {
            return false;
        }
        let Some(stem) = nombre.strip_suffix(INTERIOR_EXTENSION) else {
            return false;
        };
        manifest
            .sufijos
            .iter()
            .any(|sufijo| stem.ends_with(&format!("-{sufijo}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingConfig;
    use std::collections::HashMap;

    const BASE: &str = "TUTGMF0001003920241002-0001";

    fn validator() -> ZipContentValidator {
        ZipContentValidator::new(ManifestRules::new(&HashMap::new(), &NamingConfig::default()))
    }

    fn listing(suffixes: &[&str]) -> Vec<String> {
        suffixes
            .iter()
            .map(|s| format!("RE_{BASE}-{s}.txt"))
            .collect()
    }

    #[test]
    fn test_exact_manifest_passes() {
        let v = validator();
        assert_eq!(v.validate_contents("01", BASE, &listing(&["01", "02", "03"])), Ok(()));
    }

    #[test]
    fn test_count_mismatch_fails_regardless_of_naming() {
        let v = validator();
        for bad in [listing(&["01", "02"]), listing(&["01", "02", "03", "01"])] {
            match v.validate_contents("01", BASE, &bad) {
                Err(ZipValidationError::UnexpectedFileCount { expected, found, .. }) => {
                    assert_eq!(expected, 3);
                    assert_eq!(found, bad.len());
                }
                other => panic!("expected count failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_first_bad_name_invalidates_whole_attempt() {
        let v = validator();
        let mut nombres = listing(&["01", "02"]);
        nombres.push(format!("RE_{BASE}-09.txt"));
        let err = v.validate_contents("01", BASE, &nombres).unwrap_err();
        assert!(matches!(err, ZipValidationError::InvalidFileSuffix { .. }));
        assert_eq!(
            err.error_code(),
            Some(crate::constants::error_codes::SUFIJO_INVALIDO)
        );
    }

    #[test]
    fn test_name_must_carry_prefix_base_and_extension() {
        let v = validator();
        // missing RE_ head
        let mut nombres = listing(&["01", "02"]);
        nombres.push(format!("XX_{BASE}-03.txt"));
        assert!(v.validate_contents("01", BASE, &nombres).is_err());

        // base name absent
        let mut nombres = listing(&["01", "02"]);
        nombres.push("RE_OTROARCHIVO-03.txt".to_string());
        assert!(v.validate_contents("01", BASE, &nombres).is_err());

        // wrong extension
        let mut nombres = listing(&["01", "02"]);
        nombres.push(format!("RE_{BASE}-03.dat"));
        assert!(v.validate_contents("01", BASE, &nombres).is_err());
    }

    #[test]
    fn test_unknown_response_type_has_no_escalation_code() {
        let v = validator();
        let err = v
            .validate_contents("99", BASE, &listing(&["01", "02", "03"]))
            .unwrap_err();
        assert!(matches!(err, ZipValidationError::UnknownResponseType { .. }));
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_extract_suffix() {
        let rules = ManifestRules::new(&HashMap::new(), &NamingConfig::default());
        let manifest = rules.expected_manifest("01").unwrap();
        assert_eq!(
            ZipContentValidator::extract_suffix(manifest, &format!("RE_{BASE}-02.txt")),
            Some("02")
        );
        assert_eq!(
            ZipContentValidator::extract_suffix(manifest, &format!("RE_{BASE}-09.txt")),
            None
        );
    }
}
