//! YAML parser for store configuration
//!
//! Parses and validates store config files.

use super::types::StoreConfig;
use crate::error::{Error, Result};
use crate::types::BackendKind;
use std::fs;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Load a store config from a YAML file
///
/// Relative `seed_file` paths are resolved against the config file's directory.
pub fn load_config(path: impl AsRef<Path>) -> Result<StoreConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;

    let mut config = load_config_from_str(&content)?;

    if let Some(base) = path.parent() {
        for table in &mut config.tables {
            if let Some(seed) = table.seed_file.as_mut() {
                if seed.is_relative() {
                    *seed = base.join(&*seed);
                }
            }
        }
    }

    debug!(
        path = %path.display(),
        tables = config.tables.len(),
        backend = ?config.backend,
        "Loaded store config"
    );
    Ok(config)
}

/// Load a store config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<StoreConfig> {
    let config: StoreConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse store config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate a store config
pub fn validate_config(config: &StoreConfig) -> Result<()> {
    if config.tables.is_empty() {
        return Err(Error::config("Store config must define at least one table"));
    }

    // Rejects empty and duplicate table names
    config.registry()?;

    if config.backend == BackendKind::Remote {
        if let Some(endpoint) = config.endpoint.as_deref() {
            let url = Url::parse(endpoint)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "Endpoint must be http or https, got '{}'",
                    url.scheme()
                )));
            }
        }
        if config.region.as_deref() == Some("") {
            return Err(Error::config("Region cannot be empty"));
        }
    }

    Ok(())
}
