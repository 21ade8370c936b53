//! The bus abstraction shared by the Zenoh transport and the in-memory bus.

use std::sync::Arc;

use async_trait::async_trait;

use chargemeter_common::BusValue;

use crate::error::Result;
use crate::item::ItemTable;

/// Operations a service needs from the shared bus.
///
/// A participant is a named service (e.g. `com.victronenergy.charger.ttyS2`)
/// owning a tree of attribute paths.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Names of the services currently live on the bus, in enumeration order.
    async fn live_participants(&self) -> Result<Vec<String>>;

    /// Read an attribute of another service.
    ///
    /// `Ok(None)` means nobody answered for that path.
    async fn read(&self, service: &str, path: &str) -> Result<Option<BusValue>>;

    /// Announce a new value of one of our own paths.
    async fn publish(&self, service: &str, path: &str, value: &BusValue) -> Result<()>;

    /// Register a service: mark it live and serve its items to other participants.
    async fn register(&self, service: &str, items: Arc<ItemTable>) -> Result<()>;
}
