//! In-process bus.
//!
//! Holds registered services and simulated remote devices in one process.
//! Used by tests and for running a bridge against scripted devices.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chargemeter_common::BusValue;

use crate::bus::Bus;
use crate::error::{BusError, Result};
use crate::item::ItemTable;

#[derive(Debug, Default)]
struct MemoryState {
    /// Live participant names in registration order.
    participants: Vec<String>,
    /// Attributes of simulated remote services.
    remote: HashMap<String, HashMap<String, BusValue>>,
    /// Item tables of services registered through [`Bus::register`].
    local: HashMap<String, Arc<ItemTable>>,
    /// Every publish, in order.
    published: Vec<(String, String, BusValue)>,
    /// When set, bus queries fail with this message.
    failure: Option<String>,
}

/// A bus living entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBus {
    state: Mutex<MemoryState>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bring a simulated remote service online with the given attributes.
    pub fn add_service<I, P>(&self, name: &str, attributes: I)
    where
        I: IntoIterator<Item = (P, BusValue)>,
        P: Into<String>,
    {
        let mut state = self.state();
        if !state.participants.iter().any(|p| p == name) {
            state.participants.push(name.to_string());
        }
        let attrs = state.remote.entry(name.to_string()).or_default();
        for (path, value) in attributes {
            attrs.insert(path.into(), value);
        }
    }

    /// Change one attribute of a simulated remote service.
    pub fn set_attribute(&self, name: &str, path: &str, value: impl Into<BusValue>) {
        let mut state = self.state();
        state
            .remote
            .entry(name.to_string())
            .or_default()
            .insert(path.to_string(), value.into());
    }

    /// Take a service off the bus.
    pub fn remove_service(&self, name: &str) {
        let mut state = self.state();
        state.participants.retain(|p| p != name);
        state.remote.remove(name);
        state.local.remove(name);
    }

    /// Make every subsequent query fail (`Some`) or succeed again (`None`).
    pub fn set_failure(&self, failure: Option<&str>) {
        self.state().failure = failure.map(str::to_string);
    }

    /// Everything published so far as `(service, path, value)`.
    pub fn published(&self) -> Vec<(String, String, BusValue)> {
        self.state().published.clone()
    }

    /// Item table of a registered service.
    pub fn service_items(&self, name: &str) -> Option<Arc<ItemTable>> {
        self.state().local.get(name).cloned()
    }

    fn check_failure(state: &MemoryState, key: &str) -> Result<()> {
        match &state.failure {
            Some(message) => Err(BusError::read(key, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn live_participants(&self) -> Result<Vec<String>> {
        let state = self.state();
        Self::check_failure(&state, "participants")?;
        Ok(state.participants.clone())
    }

    async fn read(&self, service: &str, path: &str) -> Result<Option<BusValue>> {
        let state = self.state();
        Self::check_failure(&state, &format!("{}{}", service, path))?;

        if !state.participants.iter().any(|p| p == service) {
            return Ok(None);
        }
        if let Some(attrs) = state.remote.get(service) {
            return Ok(attrs.get(path).cloned());
        }
        Ok(state.local.get(service).and_then(|items| items.get(path)))
    }

    async fn publish(&self, service: &str, path: &str, value: &BusValue) -> Result<()> {
        self.state()
            .published
            .push((service.to_string(), path.to_string(), value.clone()));
        Ok(())
    }

    async fn register(&self, service: &str, items: Arc<ItemTable>) -> Result<()> {
        let mut state = self.state();
        if state.participants.iter().any(|p| p == service) {
            return Err(BusError::Registration {
                service: service.to_string(),
                message: "name already taken".to_string(),
            });
        }
        state.participants.push(service.to_string());
        state.local.insert(service.to_string(), items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    #[tokio::test]
    async fn test_remote_service_lifecycle() {
        let bus = MemoryBus::new();
        bus.add_service(
            "com.victronenergy.charger.ttyS2",
            [("/Dc/0/Current", BusValue::Float(10.5))],
        );

        assert_eq!(
            bus.live_participants().await.unwrap(),
            vec!["com.victronenergy.charger.ttyS2"]
        );
        assert_eq!(
            bus.read("com.victronenergy.charger.ttyS2", "/Dc/0/Current")
                .await
                .unwrap(),
            Some(BusValue::Float(10.5))
        );
        assert_eq!(
            bus.read("com.victronenergy.charger.ttyS2", "/Dc/0/Voltage")
                .await
                .unwrap(),
            None
        );

        bus.remove_service("com.victronenergy.charger.ttyS2");
        assert!(bus.live_participants().await.unwrap().is_empty());
        assert_eq!(
            bus.read("com.victronenergy.charger.ttyS2", "/Dc/0/Current")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_registered_service_is_readable() {
        let bus = MemoryBus::new();
        let items = Arc::new(ItemTable::new());
        items.declare("/Serial", Item::new("HQ2084P4XX")).unwrap();

        bus.register("svc", items.clone()).await.unwrap();
        assert_eq!(
            bus.read("svc", "/Serial").await.unwrap(),
            Some(BusValue::from("HQ2084P4XX"))
        );
        assert!(bus.register("svc", items).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let bus = MemoryBus::new();
        bus.set_failure(Some("bus gone"));
        assert!(matches!(
            bus.live_participants().await,
            Err(BusError::Read { .. })
        ));

        bus.set_failure(None);
        assert!(bus.live_participants().await.is_ok());
    }
}
