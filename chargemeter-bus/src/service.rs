//! A service published on the bus under its own name.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chargemeter_common::BusValue;

use crate::bus::Bus;
use crate::error::Result;
use crate::item::{Item, ItemTable};

/// A named bus service and the paths it owns.
///
/// Paths are declared first, then the service is registered once. Values set
/// after registration are announced on the bus when they change.
pub struct DeviceService {
    name: String,
    items: Arc<ItemTable>,
    bus: Arc<dyn Bus>,
    registered: AtomicBool,
}

impl DeviceService {
    /// Create an unregistered service.
    pub fn new(name: impl Into<String>, bus: Arc<dyn Bus>) -> Self {
        Self {
            name: name.into(),
            items: Arc::new(ItemTable::new()),
            bus,
            registered: AtomicBool::new(false),
        }
    }

    /// Service name on the bus.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The service's item table.
    pub fn items(&self) -> &Arc<ItemTable> {
        &self.items
    }

    /// The bus this service lives on.
    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Declare a path with its initial value and access rules.
    pub fn add_path(&self, path: impl Into<String>, item: Item) -> Result<()> {
        self.items.declare(path, item)
    }

    /// Register the service on the bus.
    pub async fn register(&self) -> Result<()> {
        self.bus.register(&self.name, self.items.clone()).await?;
        self.registered.store(true, Ordering::Release);

        tracing::info!(
            service = %self.name,
            paths = self.items.len(),
            "Service registered"
        );
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Current value of one of our paths.
    pub fn get(&self, path: &str) -> Option<BusValue> {
        self.items.get(path)
    }

    /// Set one of our paths, announcing the change once registered.
    pub async fn set(&self, path: &str, value: impl Into<BusValue>) -> Result<()> {
        let value = value.into();
        let changed = self.items.set(path, value.clone())?;

        if changed && self.is_registered() {
            self.bus.publish(&self.name, path, &value).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceService")
            .field("name", &self.name)
            .field("paths", &self.items.len())
            .field("registered", &self.is_registered())
            .finish()
    }
}
