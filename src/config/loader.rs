//! Configuration Loader
//!
//! File discovery and merge for the ingestion core. A TOML file is located
//! (explicit path, `RTA_CONFIG_PATH`, or the default search list), merged
//! with `RTA__`-prefixed environment overrides, deserialized into
//! [`RtaConfig`](super::RtaConfig) and validated. Any failure here is
//! startup-fatal; there is no emergency fallback configuration because a
//! half-configured grammar would silently misclassify filenames.

use super::error::{ConfigResult, ConfigurationError};
use super::RtaConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
const CONFIG_PATH_VAR: &str = "RTA_CONFIG_PATH";

/// Loaded-and-validated configuration plus its provenance.
pub struct ConfigManager {
    config: RtaConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with file auto-discovery.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = match env::var(CONFIG_PATH_VAR) {
            Ok(explicit) => {
                let path = PathBuf::from(explicit);
                if !path.exists() {
                    return Err(ConfigurationError::config_file_not_found(vec![path]));
                }
                Some(path)
            }
            Err(_) => Self::discover_config_file(),
        };
        Self::load_from_path(path)
    }

    /// Load configuration from a specific file, or from environment
    /// overrides plus defaults when no file is given.
    pub fn load_from_path(config_path: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let mut builder = Config::builder();

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        } else {
            debug!("No configuration file found; using defaults plus environment overrides");
        }

        // RTA__DATABASE__URL=... overrides database.url, and so on
        builder = builder.add_source(
            Environment::with_prefix("RTA")
                .prefix_separator("__")
                .separator("__"),
        );

        let merged = builder.build().map_err(|e| {
            ConfigurationError::invalid_source(Self::source_label(config_path.as_deref()), e)
        })?;

        let defaults = RtaConfig::default();
        let mut config: RtaConfig = merged.try_deserialize().map_err(|e| {
            ConfigurationError::invalid_source(Self::source_label(config_path.as_deref()), e)
        })?;

        // serde(default) fills absent sections from type defaults, but a file
        // that names a section with only some keys still merges correctly
        // through the config crate; the remaining gap is the valid-state set,
        // which must never deserialize to empty silently
        if config.states.validos.is_empty() {
            config.states.validos = defaults.states.validos.clone();
        }

        config.validate()?;

        info!(
            entrada = %config.queues.entrada,
            salida = %config.queues.salida,
            bucket = %config.storage.bucket,
            manifiestos = config.manifiestos.len(),
            "Configuration loaded and validated"
        );

        Ok(Arc::new(ConfigManager {
            config,
            config_path,
        }))
    }

    /// The loaded configuration.
    pub fn config(&self) -> &RtaConfig {
        &self.config
    }

    /// Path of the file the configuration was loaded from, when one was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn source_label(path: Option<&Path>) -> String {
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "<environment>".to_string())
    }

    fn discover_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("rta-config.toml"),
            PathBuf::from("config/rta-config.toml"),
            PathBuf::from("/etc/rta/rta-config.toml"),
        ];
        candidates.into_iter().find(|p| p.exists())
    }
}
