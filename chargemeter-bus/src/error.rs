//! Error types for the bus framework.

use thiserror::Error;

/// Result type alias using [`BusError`].
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur while talking to the bus.
#[derive(Error, Debug)]
pub enum BusError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Zenoh connection error.
    #[error("Bus connection error: {0}")]
    Connection(String),

    /// Zenoh session error.
    #[error("Bus session error: {0}")]
    Session(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publishing error.
    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },

    /// Reading an attribute from another service failed.
    #[error("Failed to read {key}: {message}")]
    Read { key: String, message: String },

    /// Liveliness token error.
    #[error("Liveliness error: {0}")]
    Liveliness(String),

    /// Service registration error.
    #[error("Failed to register service {service}: {message}")]
    Registration { service: String, message: String },

    /// Path not declared on the service.
    #[error("Unknown path: {0}")]
    UnknownPath(String),

    /// Path declared twice on the same service.
    #[error("Path already declared: {0}")]
    DuplicatePath(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a liveliness error.
    pub fn liveliness(msg: impl Into<String>) -> Self {
        Self::Liveliness(msg.into())
    }

    /// Create a read error for a key.
    pub fn read(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

impl From<zenoh::Error> for BusError {
    fn from(err: zenoh::Error) -> Self {
        Self::Session(err.to_string())
    }
}

impl From<chargemeter_common::Error> for BusError {
    fn from(err: chargemeter_common::Error) -> Self {
        match err {
            chargemeter_common::Error::Config(msg) => Self::Config(msg),
            chargemeter_common::Error::Zenoh(e) => Self::Session(e.to_string()),
            chargemeter_common::Error::Io(e) => Self::Io(e),
            other => Self::Serialization(other.to_string()),
        }
    }
}
