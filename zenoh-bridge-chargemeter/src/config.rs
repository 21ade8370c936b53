//! Configuration for the charger meter bridge.
//!
//! Every key of the `Setup` section is optional; the getters fall back to
//! built-in defaults so a partial (or empty) file is always usable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use chargemeter_bus::{BridgeConfig, BusError, Format, LoggingConfig, Result, ZenohConfig};

/// Configuration template written on first run when no file exists.
pub const SAMPLE_CONFIG: &str = include_str!("../charger_meter.sample.json5");

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "CHARGEMETER_CONFIG";

/// Upstream charger service name when none is configured.
pub const DEFAULT_DEVICE: &str = "com.victronenergy.charger.ttyUSB0";

/// Display name when none is configured.
pub const DEFAULT_PRODUCT_NAME: &str = "Virtual AC Charger Meter";

/// Service name of the virtual device.
pub const DEFAULT_SERVICE_NAME: &str = "com.victronenergy.dcsource.ip22";

/// Device instance of the virtual device.
pub const DEFAULT_DEVICE_INSTANCE: u32 = 291;

/// Service name prefix identifying chargers.
pub const DEFAULT_DEVICE_PREFIX: &str = "com.victronenergy.charger.";

/// Poll period in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargerMeterConfig {
    /// Device setup.
    #[serde(rename = "Setup", default)]
    pub setup: SetupConfig,

    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Encoding of attribute values on the bus
    #[serde(default)]
    pub serialization: Format,
}

/// The `Setup` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Service name of the upstream charger.
    pub device: Option<String>,

    /// Enable debug logging.
    pub debug: Option<bool>,

    /// Display name of the virtual device.
    pub name: Option<String>,

    /// Service name the virtual device registers under.
    pub service: Option<String>,

    /// Device instance of the virtual device.
    pub instance: Option<u32>,

    /// Negate the charger current when republishing.
    pub invert_current: Option<bool>,

    /// Service name prefixes accepted when looking for a replacement charger.
    pub device_prefixes: Option<Vec<String>>,

    /// Poll period in milliseconds.
    pub poll_interval_ms: Option<u64>,

    /// Publish `/History/EnergyOut`.
    pub energy_out: Option<bool>,
}

impl ChargerMeterConfig {
    pub fn get_device(&self) -> String {
        self.setup
            .device
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string())
    }

    pub fn get_debug(&self) -> bool {
        self.setup.debug.unwrap_or(false)
    }

    pub fn get_product_name(&self) -> String {
        self.setup
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string())
    }

    /// Version of this build.
    pub fn get_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn get_service_name(&self) -> String {
        self.setup
            .service
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
    }

    pub fn get_device_instance(&self) -> u32 {
        self.setup.instance.unwrap_or(DEFAULT_DEVICE_INSTANCE)
    }

    pub fn get_invert_current(&self) -> bool {
        self.setup.invert_current.unwrap_or(true)
    }

    pub fn get_device_prefixes(&self) -> Vec<String> {
        self.setup
            .device_prefixes
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_DEVICE_PREFIX.to_string()])
    }

    pub fn get_poll_interval_ms(&self) -> u64 {
        self.setup
            .poll_interval_ms
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    pub fn get_publish_energy_out(&self) -> bool {
        self.setup.energy_out.unwrap_or(false)
    }
}

impl BridgeConfig for ChargerMeterConfig {
    fn zenoh(&self) -> &ZenohConfig {
        &self.zenoh
    }

    fn logging(&self) -> LoggingConfig {
        if self.get_debug() {
            LoggingConfig {
                level: "debug".to_string(),
                format: self.logging.format,
            }
        } else {
            self.logging.clone()
        }
    }

    fn serialization(&self) -> Format {
        self.serialization
    }

    fn validate(&self) -> Result<()> {
        if self.get_poll_interval_ms() == 0 {
            return Err(BusError::validation("Setup.poll_interval_ms must be > 0"));
        }

        if self.get_service_name().is_empty() {
            return Err(BusError::validation("Setup.service cannot be empty"));
        }

        if self.get_device().is_empty() {
            return Err(BusError::validation("Setup.device cannot be empty"));
        }

        let prefixes = self.get_device_prefixes();
        if prefixes.is_empty() || prefixes.iter().any(|p| p.is_empty()) {
            return Err(BusError::validation(
                "Setup.device_prefixes must list at least one non-empty prefix",
            ));
        }

        Ok(())
    }
}

/// Location of the configuration file.
///
/// `$CHARGEMETER_CONFIG` when set, otherwise `conf/charger_meter.json5` next
/// to the directory holding the executable.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("..")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("conf").join("charger_meter.json5")
}
