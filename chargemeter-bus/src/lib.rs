//! Charger meter bus framework
//!
//! Abstractions for publishing a device service on the shared bus and
//! reading other services from it.
//!
//! # Overview
//!
//! This framework provides:
//! - [`Bus`] trait for the bus operations a bridge needs
//! - [`DeviceService`] and [`ItemTable`] for the paths a service publishes
//! - [`ZenohBus`] transport and the in-process [`MemoryBus`]
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (startup, shutdown, signal handling)
//!
//! # Example
//!
//! ```ignore
//! use chargemeter_bus::{BridgeConfig, BridgeRunner, DeviceService, Item};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MyConfig::load_or_materialize(&path, TEMPLATE)?;
//!     let mut runner = BridgeRunner::new("mybridge", "0.1.0", config).await?;
//!
//!     let service = DeviceService::new("com.example.device", runner.bus());
//!     service.add_path("/Connected", Item::new(1i64))?;
//!     service.register().await?;
//!
//!     runner.spawn(async move { /* poll and publish */ });
//!     runner.run().await
//! }
//! ```

mod bus;
mod config;
mod error;
mod item;
pub mod memory;
mod runner;
mod service;
mod zenoh_bus;

pub use bus::Bus;
pub use config::BridgeConfig;
pub use error::{BusError, Result};
pub use item::{
    ChangeHook, Item, ItemTable, RegisterHandler, RegisterResponse, RegisterStatus, WriteOutcome,
    accept_all,
};
pub use memory::MemoryBus;
pub use runner::BridgeRunner;
pub use service::DeviceService;
pub use zenoh_bus::ZenohBus;

// Re-export commonly used types from chargemeter-common
pub use chargemeter_common::{
    BusKeys, BusValue, Format, LogFormat, LoggingConfig, RegisterOp, ZenohConfig,
};
