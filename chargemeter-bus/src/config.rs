//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use chargemeter_common::{Format, parse_config};

use crate::error::{BusError, Result};
use crate::{LoggingConfig, ZenohConfig};

/// Trait for bridge configuration types.
///
/// Implement this for a bridge's configuration struct to get loading,
/// validation, first-run materialization and access to the common fields.
pub trait BridgeConfig: Sized + DeserializeOwned {
    /// Get the Zenoh configuration.
    fn zenoh(&self) -> &ZenohConfig;

    /// Effective logging configuration.
    fn logging(&self) -> LoggingConfig;

    /// Serialization format of attribute values on the bus.
    fn serialization(&self) -> Format {
        Format::default()
    }

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Override to add custom validation.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Parse and validate configuration from JSON5 text.
    fn parse(content: &str) -> Result<Self> {
        let config: Self =
            parse_config(content).map_err(|e| BusError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BusError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration, first writing `template` to `path` if no file exists.
    fn load_or_materialize(path: impl AsRef<Path>, template: &str) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, template)?;
            tracing::info!(path = %path.display(), "Wrote default configuration");
        }

        Self::load(path)
    }
}
