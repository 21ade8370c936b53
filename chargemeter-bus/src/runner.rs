//! Bridge runner for lifecycle management.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;

use chargemeter_common::{BusKeys, connect, init_tracing};

use crate::config::BridgeConfig;
use crate::error::{BusError, Result};
use crate::zenoh_bus::ZenohBus;

/// Bridge runner that manages the lifecycle of a bus bridge.
///
/// Handles:
/// - Logging initialization
/// - Zenoh connection
/// - Task spawning and management
/// - Graceful shutdown on Ctrl+C
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging.
    name: String,
    /// The loaded configuration.
    config: C,
    /// Zenoh session.
    session: Arc<zenoh::Session>,
    /// Bus transport on the session.
    bus: Arc<ZenohBus>,
    /// Spawned tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner.
    ///
    /// This will:
    /// 1. Initialize logging from the configuration
    /// 2. Connect to Zenoh
    /// 3. Create the bus transport
    pub async fn new(name: impl Into<String>, version: &str, config: C) -> Result<Self> {
        let name = name.into();

        init_tracing(&config.logging()).map_err(|e| BusError::config(e.to_string()))?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        let session = Arc::new(
            connect(config.zenoh())
                .await
                .map_err(|e| BusError::Connection(e.to_string()))?,
        );

        let bus = Arc::new(ZenohBus::new(
            session.clone(),
            BusKeys::new(config.zenoh().prefix.clone()),
            config.serialization(),
        ));

        Ok(Self {
            name,
            config,
            session,
            bus,
            tasks: Vec::new(),
        })
    }

    /// Get the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get the bus transport.
    pub fn bus(&self) -> Arc<ZenohBus> {
        self.bus.clone()
    }

    /// Spawn a worker task.
    ///
    /// The task will be tracked and aborted on shutdown.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.push(handle);
    }

    /// Run the bridge until Ctrl+C is received.
    ///
    /// This will:
    /// 1. Wait for Ctrl+C signal
    /// 2. Abort all spawned tasks
    /// 3. Withdraw registered services from the bus
    /// 4. Close the Zenoh session
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            bridge = %self.name,
            tasks = self.tasks.len(),
            "Bridge running. Press Ctrl+C to stop."
        );

        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }

        tracing::info!(bridge = %self.name, "Received shutdown signal");

        for task in &self.tasks {
            task.abort();
        }

        self.bus.shutdown().await;

        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "Error closing Zenoh session");
        }

        tracing::info!(bridge = %self.name, "Goodbye!");

        Ok(())
    }
}
