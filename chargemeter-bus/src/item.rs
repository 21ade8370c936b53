//! Attribute items owned by a bus service.
//!
//! An [`ItemTable`] is the set of paths a service publishes. Each path holds
//! a current value and, optionally, a change hook (for paths other services
//! may write) or a register handler (for register link items).

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use chargemeter_common::BusValue;

use crate::error::{BusError, Result};

/// Hook consulted when another bus participant writes a path.
///
/// Returns `true` to accept the new value.
pub type ChangeHook = Arc<dyn Fn(&str, &BusValue) -> bool + Send + Sync>;

/// A change hook that accepts every write.
pub fn accept_all() -> ChangeHook {
    Arc::new(|_: &str, _: &BusValue| true)
}

/// Status codes of the register link protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum RegisterStatus {
    Ok,
    Unknown,
    NotSupported,
    ParameterError,
}

impl RegisterStatus {
    pub fn code(&self) -> u16 {
        match self {
            RegisterStatus::Ok => 0x0000,
            RegisterStatus::Unknown => 0x8100,
            RegisterStatus::NotSupported => 0x8200,
            RegisterStatus::ParameterError => 0x8400,
        }
    }
}

impl From<RegisterStatus> for u16 {
    fn from(status: RegisterStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for RegisterStatus {
    type Error = String;

    fn try_from(code: u16) -> std::result::Result<Self, Self::Error> {
        match code {
            0x0000 => Ok(RegisterStatus::Ok),
            0x8100 => Ok(RegisterStatus::Unknown),
            0x8200 => Ok(RegisterStatus::NotSupported),
            0x8400 => Ok(RegisterStatus::ParameterError),
            other => Err(format!("unknown register status 0x{:04X}", other)),
        }
    }
}

/// Answer to a register get or set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: RegisterStatus,
    pub payload: Vec<u8>,
}

impl RegisterResponse {
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: RegisterStatus::Ok,
            payload: payload.into(),
        }
    }

    pub fn error(status: RegisterStatus) -> Self {
        Self {
            status,
            payload: Vec::new(),
        }
    }
}

/// Handler behind a register link item.
pub trait RegisterHandler: Send + Sync {
    /// Read a register.
    fn get(&self, register_id: u16) -> RegisterResponse;

    /// Write a register.
    fn set(&self, register_id: u16, payload: &[u8]) -> RegisterResponse;
}

/// Declaration of a single path.
#[derive(Clone)]
pub struct Item {
    value: BusValue,
    on_change: Option<ChangeHook>,
    register_handler: Option<Arc<dyn RegisterHandler>>,
}

impl Item {
    /// A read-only item with an initial value.
    pub fn new(initial: impl Into<BusValue>) -> Self {
        Self {
            value: initial.into(),
            on_change: None,
            register_handler: None,
        }
    }

    /// Make the item writeable by other participants, guarded by `hook`.
    pub fn writeable(mut self, hook: ChangeHook) -> Self {
        self.on_change = Some(hook);
        self
    }

    /// A register link item. Its value stays `Null`; requests go to `handler`.
    pub fn register_link(handler: Arc<dyn RegisterHandler>) -> Self {
        Self {
            value: BusValue::Null,
            on_change: None,
            register_handler: Some(handler),
        }
    }

    pub fn is_writeable(&self) -> bool {
        self.on_change.is_some()
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("value", &self.value)
            .field("writeable", &self.is_writeable())
            .field("register_link", &self.register_handler.is_some())
            .finish()
    }
}

/// Result of an external write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Hook accepted; value stored.
    Accepted,
    /// Hook rejected; value unchanged.
    Rejected,
    /// Path exists but is not writeable.
    ReadOnly,
    /// Path not declared.
    UnknownPath,
}

/// Paths and current values of one service.
#[derive(Debug, Default)]
pub struct ItemTable {
    items: RwLock<BTreeMap<String, Item>>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a path. Each path may be declared once.
    pub fn declare(&self, path: impl Into<String>, item: Item) -> Result<()> {
        let path = path.into();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.contains_key(&path) {
            return Err(BusError::DuplicatePath(path));
        }
        items.insert(path, item);
        Ok(())
    }

    /// Current value of a path.
    pub fn get(&self, path: &str) -> Option<BusValue> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(path).map(|item| item.value.clone())
    }

    /// Set a path from the owning service. Returns whether the value changed.
    pub fn set(&self, path: &str, value: BusValue) -> Result<bool> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        let item = items
            .get_mut(path)
            .ok_or_else(|| BusError::UnknownPath(path.to_string()))?;

        if item.value == value {
            return Ok(false);
        }
        item.value = value;
        Ok(true)
    }

    /// Apply a write coming from another bus participant.
    pub fn write_external(&self, path: &str, value: BusValue) -> WriteOutcome {
        let hook = {
            let items = self.items.read().unwrap_or_else(|e| e.into_inner());
            match items.get(path) {
                None => return WriteOutcome::UnknownPath,
                Some(item) => match &item.on_change {
                    None => return WriteOutcome::ReadOnly,
                    Some(hook) => hook.clone(),
                },
            }
        };

        // The hook runs without the lock held so it may read the table.
        if !hook(path, &value) {
            return WriteOutcome::Rejected;
        }

        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        match items.get_mut(path) {
            Some(item) => {
                item.value = value;
                WriteOutcome::Accepted
            }
            None => WriteOutcome::UnknownPath,
        }
    }

    /// Route a register read to the handler of the item at `path`.
    pub fn register_get(&self, path: &str, register_id: u16) -> RegisterResponse {
        match self.register_handler(path) {
            Some(handler) => handler.get(register_id),
            None => RegisterResponse::error(RegisterStatus::NotSupported),
        }
    }

    /// Route a register write to the handler of the item at `path`.
    pub fn register_set(&self, path: &str, register_id: u16, payload: &[u8]) -> RegisterResponse {
        match self.register_handler(path) {
            Some(handler) => handler.set(register_id, payload),
            None => RegisterResponse::error(RegisterStatus::NotSupported),
        }
    }

    fn register_handler(&self, path: &str) -> Option<Arc<dyn RegisterHandler>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(path).and_then(|item| item.register_handler.clone())
    }

    /// All declared paths with their current values, in path order.
    pub fn snapshot(&self) -> Vec<(String, BusValue)> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items
            .iter()
            .map(|(path, item)| (path.clone(), item.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRegisters;

    impl RegisterHandler for EchoRegisters {
        fn get(&self, register_id: u16) -> RegisterResponse {
            RegisterResponse::ok(register_id.to_be_bytes())
        }

        fn set(&self, _register_id: u16, payload: &[u8]) -> RegisterResponse {
            RegisterResponse::ok(payload)
        }
    }

    #[test]
    fn test_declare_and_get() {
        let table = ItemTable::new();
        table.declare("/ProductId", Item::new(0xA389i64)).unwrap();

        assert_eq!(table.get("/ProductId"), Some(BusValue::Integer(0xA389)));
        assert_eq!(table.get("/Missing"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let table = ItemTable::new();
        table.declare("/Mode", Item::new(1i64)).unwrap();
        let err = table.declare("/Mode", Item::new(4i64)).unwrap_err();
        assert!(matches!(err, BusError::DuplicatePath(p) if p == "/Mode"));
    }

    #[test]
    fn test_set_reports_change() {
        let table = ItemTable::new();
        table.declare("/Connected", Item::new(1i64)).unwrap();

        assert!(!table.set("/Connected", BusValue::Integer(1)).unwrap());
        assert!(table.set("/Connected", BusValue::Integer(0)).unwrap());
        assert_eq!(table.get("/Connected"), Some(BusValue::Integer(0)));

        assert!(matches!(
            table.set("/Nope", BusValue::Null),
            Err(BusError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_external_write_hooks() {
        let table = ItemTable::new();
        table
            .declare("/Mode", Item::new(1i64).writeable(accept_all()))
            .unwrap();
        table
            .declare(
                "/ChargeCurrentLimit",
                Item::new(15i64).writeable(Arc::new(|_: &str, v: &BusValue| {
                    v.as_f64().is_some_and(|a| a >= 0.0)
                })),
            )
            .unwrap();
        table.declare("/Serial", Item::new("HQ2084P4XX")).unwrap();

        assert_eq!(
            table.write_external("/Mode", BusValue::Integer(4)),
            WriteOutcome::Accepted
        );
        assert_eq!(table.get("/Mode"), Some(BusValue::Integer(4)));

        assert_eq!(
            table.write_external("/ChargeCurrentLimit", BusValue::Integer(-1)),
            WriteOutcome::Rejected
        );
        assert_eq!(table.get("/ChargeCurrentLimit"), Some(BusValue::Integer(15)));

        assert_eq!(
            table.write_external("/Serial", BusValue::from("X")),
            WriteOutcome::ReadOnly
        );
        assert_eq!(
            table.write_external("/Unknown", BusValue::Null),
            WriteOutcome::UnknownPath
        );
    }

    #[test]
    fn test_register_routing() {
        let table = ItemTable::new();
        table
            .declare("/Devices/0/VregLink", Item::register_link(Arc::new(EchoRegisters)))
            .unwrap();
        table.declare("/Serial", Item::new("HQ2084P4XX")).unwrap();

        assert_eq!(
            table.register_get("/Devices/0/VregLink", 0x0102),
            RegisterResponse::ok(vec![0x01, 0x02])
        );
        assert_eq!(
            table.register_set("/Devices/0/VregLink", 7, &[9, 9]),
            RegisterResponse::ok(vec![9, 9])
        );
        assert_eq!(
            table.register_get("/Serial", 1).status,
            RegisterStatus::NotSupported
        );
        assert_eq!(table.get("/Devices/0/VregLink"), Some(BusValue::Null));
    }

    #[test]
    fn test_register_status_codes() {
        assert_eq!(RegisterStatus::Ok.code(), 0);
        assert_eq!(RegisterStatus::try_from(0x8200), Ok(RegisterStatus::NotSupported));
        assert!(RegisterStatus::try_from(0x1234).is_err());
    }
}
