//! Parameter Store
//!
//! Read-only secret and parameter lookups behind a trait seam. Components
//! that need credentials or ad-hoc JSON parameters depend on
//! [`ParameterStore`], not on the configuration structs, so tests can
//! substitute a map-backed double and production code can later swap the
//! backing source without touching callers.

use super::error::{ConfigResult, ConfigurationError};
use super::RtaConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Username/password pair resolved from a named secret.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DbSecret {
    pub username: String,
    pub password: String,
}

/// Read-only key lookup for secrets and JSON parameters.
pub trait ParameterStore: Send + Sync {
    fn get_secret(&self, name: &str) -> ConfigResult<DbSecret>;
    fn get_parameter(&self, name: &str) -> ConfigResult<serde_json::Value>;
}

/// Production parameter store fronting the merged configuration.
pub struct ConfigParameterStore {
    secrets: HashMap<String, DbSecret>,
    parameters: HashMap<String, serde_json::Value>,
}

impl ConfigParameterStore {
    pub fn new(config: &RtaConfig) -> Arc<Self> {
        Arc::new(Self {
            secrets: config.secrets.clone(),
            parameters: config.parameters.clone(),
        })
    }
}

impl ParameterStore for ConfigParameterStore {
    fn get_secret(&self, name: &str) -> ConfigResult<DbSecret> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::secret_not_found(name))
    }

    fn get_parameter(&self, name: &str) -> ConfigResult<serde_json::Value> {
        self.parameters
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::parameter_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_entries() -> Arc<ConfigParameterStore> {
        let mut config = RtaConfig::default();
        config.secrets.insert(
            "db_principal".to_string(),
            DbSecret {
                username: "rta_app".to_string(),
                password: "s3cret".to_string(),
            },
        );
        config.parameters.insert(
            "ventana_carga".to_string(),
            serde_json::json!({"inicio": "06:00", "fin": "20:00"}),
        );
        ConfigParameterStore::new(&config)
    }

    #[test]
    fn test_secret_lookup() {
        let store = store_with_entries();
        let secret = store.get_secret("db_principal").unwrap();
        assert_eq!(secret.username, "rta_app");
        assert!(store.get_secret("inexistente").is_err());
    }

    #[test]
    fn test_parameter_lookup() {
        let store = store_with_entries();
        let value = store.get_parameter("ventana_carga").unwrap();
        assert_eq!(value["inicio"], "06:00");
        assert!(store.get_parameter("otro").is_err());
    }
}
