//! # Manifest Rules
//!
//! Expected zip contents per response type. Each response-type code ("01",
//! "02", ...) maps to the number of interior files a valid archive carries
//! and the suffix set those files may end with. The map is configuration;
//! an unknown code means processing cannot continue for the attempt (there
//! is no way to know how many files to expect), so lookups surface absence
//! and the caller propagates it as a configuration failure, never a retry.

use crate::config::ManifestConfig;
use crate::constants::FileFamily;
use crate::naming::FileKind;
use std::collections::{HashMap, HashSet};

/// Expected interior contents for one response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Number of files the archive must contain, directory entries excluded.
    pub cantidad: usize,
    /// Allowed `-{sufijo}.txt` tails for interior filenames.
    pub sufijos: HashSet<String>,
}

/// Response-type code to manifest map, plus the per-family code assignment.
#[derive(Debug, Clone)]
pub struct ManifestRules {
    manifiestos: HashMap<String, Manifest>,
    especial_tipo: String,
    general_tipo: String,
    reintegro_tipo: String,
}

impl ManifestRules {
    pub fn new(
        configured: &HashMap<String, ManifestConfig>,
        naming: &crate::config::NamingConfig,
    ) -> Self {
        let mut manifiestos: HashMap<String, Manifest> = configured
            .iter()
            .map(|(codigo, m)| {
                (
                    codigo.clone(),
                    Manifest {
                        cantidad: m.cantidad,
                        sufijos: m.sufijos.iter().cloned().collect(),
                    },
                )
            })
            .collect();

        // Unconfigured deployments still need the baseline three-file
        // manifest for the default response type
        manifiestos.entry("01".to_string()).or_insert_with(|| Manifest {
            cantidad: 3,
            sufijos: ["01", "02", "03"].iter().map(|s| s.to_string()).collect(),
        });

        Self {
            manifiestos,
            especial_tipo: naming.especial.tipo_respuesta.clone(),
            general_tipo: naming.general.tipo_respuesta.clone(),
            reintegro_tipo: naming.general.reintegro_tipo_respuesta.clone(),
        }
    }

    /// Expected manifest for a response-type code. `None` is a fatal
    /// configuration gap for the current attempt.
    pub fn expected_manifest(&self, tipo_respuesta: &str) -> Option<&Manifest> {
        self.manifiestos.get(tipo_respuesta)
    }

    /// Response-type code assigned to attempts for a classified file.
    pub fn response_type_for(&self, kind: FileKind) -> Option<&str> {
        match kind.family()? {
            FileFamily::Especial => Some(self.especial_tipo.as_str()),
            FileFamily::General => Some(self.general_tipo.as_str()),
            FileFamily::GeneralReintegro => Some(self.reintegro_tipo.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ManifestConfig, NamingConfig};

    fn rules() -> ManifestRules {
        let mut configured = HashMap::new();
        configured.insert(
            "02".to_string(),
            ManifestConfig {
                cantidad: 2,
                sufijos: vec!["01".to_string(), "04".to_string()],
            },
        );
        ManifestRules::new(&configured, &NamingConfig::default())
    }

    #[test]
    fn test_default_manifest_present() {
        let rules = rules();
        let m = rules.expected_manifest("01").unwrap();
        assert_eq!(m.cantidad, 3);
        assert!(m.sufijos.contains("02"));
    }

    #[test]
    fn test_configured_manifest_wins() {
        let rules = rules();
        let m = rules.expected_manifest("02").unwrap();
        assert_eq!(m.cantidad, 2);
        assert!(m.sufijos.contains("04"));
        assert!(!m.sufijos.contains("03"));
    }

    #[test]
    fn test_unknown_code_is_absent() {
        assert!(rules().expected_manifest("99").is_none());
    }

    #[test]
    fn test_response_type_per_family() {
        let rules = rules();
        assert_eq!(rules.response_type_for(FileKind::Special), Some("01"));
        assert_eq!(rules.response_type_for(FileKind::General), Some("01"));
        assert_eq!(rules.response_type_for(FileKind::GeneralReversal), Some("02"));
        assert_eq!(rules.response_type_for(FileKind::Invalid), None);
    }
}
