//! Paths of the virtual DC source service and of the upstream charger.

use std::sync::Arc;

use chargemeter_bus::{BusValue, ChangeHook, DeviceService, Item, RegisterHandler, Result};

use crate::model::DeviceIdentity;

pub const CONNECTED: &str = "/Connected";
pub const STATE: &str = "/State";
pub const MODE: &str = "/Mode";
pub const DC_VOLTAGE: &str = "/Dc/0/Voltage";
pub const DC_CURRENT: &str = "/Dc/0/Current";
pub const DC_POWER: &str = "/Dc/0/Power";
pub const DC_TEMPERATURE: &str = "/Dc/0/Temperature";
pub const UPDATE_INDEX: &str = "/UpdateIndex";
pub const DEVICE_INSTANCE: &str = "/DeviceInstance";
pub const PRODUCT_ID: &str = "/ProductId";
pub const PRODUCT_NAME: &str = "/ProductName";
pub const DEVICE_NAME: &str = "/DeviceName";
pub const FIRMWARE_VERSION: &str = "/FirmwareVersion";
pub const SERIAL: &str = "/Serial";
pub const DEVICE_FUNCTION: &str = "/Settings/DeviceFunction";
pub const MONITOR_MODE: &str = "/Settings/MonitorMode";
pub const CHARGE_CURRENT_LIMIT: &str = "/ChargeCurrentLimit";
pub const ENERGY_OUT: &str = "/History/EnergyOut";
pub const MGMT_PROCESS_NAME: &str = "/Mgmt/ProcessName";
pub const MGMT_PROCESS_VERSION: &str = "/Mgmt/ProcessVersion";
pub const MGMT_CONNECTION: &str = "/Mgmt/Connection";

pub const MIRROR_CUSTOM_NAME: &str = "/Devices/0/CustomName";
pub const MIRROR_DEVICE_INSTANCE: &str = "/Devices/0/DeviceInstance";
pub const MIRROR_FIRMWARE_VERSION: &str = "/Devices/0/FirmwareVersion";
pub const MIRROR_PRODUCT_ID: &str = "/Devices/0/ProductId";
pub const MIRROR_PRODUCT_NAME: &str = "/Devices/0/ProductName";
pub const MIRROR_SERVICE_NAME: &str = "/Devices/0/ServiceName";
pub const MIRROR_SERIAL: &str = "/Devices/0/Serial";
pub const VREG_LINK: &str = "/Devices/0/VregLink";

/// Paths read from the charger each tick.
pub mod upstream {
    pub const CURRENT: &str = "/Dc/0/Current";
    pub const VOLTAGE: &str = "/Dc/0/Voltage";
    pub const STATE: &str = "/State";
    pub const TEMPERATURE: &str = "/Dc/0/Temperature";
}

/// Writeable paths and their values before the first tick.
const WRITEABLE_PATHS: [(&str, BusValue); 10] = [
    (STATE, BusValue::Integer(3)),
    (MODE, BusValue::Integer(1)),
    (DC_VOLTAGE, BusValue::Float(12.8)),
    (DC_CURRENT, BusValue::Float(14.8)),
    (DC_TEMPERATURE, BusValue::Integer(18)),
    (DC_POWER, BusValue::Integer(189)),
    (DEVICE_FUNCTION, BusValue::Integer(0)),
    (MONITOR_MODE, BusValue::Integer(-2)),
    (CHARGE_CURRENT_LIMIT, BusValue::Integer(15)),
    (UPDATE_INDEX, BusValue::Integer(0)),
];

/// Declare every path of the virtual device on `service`.
pub fn declare_device_paths(
    service: &DeviceService,
    identity: &DeviceIdentity,
    registers: Arc<dyn RegisterHandler>,
    on_change: ChangeHook,
    energy_out: bool,
) -> Result<()> {
    service.add_path(MGMT_PROCESS_NAME, Item::new(identity.process_name.as_str()))?;
    service.add_path(
        MGMT_PROCESS_VERSION,
        Item::new(identity.process_version.as_str()),
    )?;
    service.add_path(MGMT_CONNECTION, Item::new(identity.connection.as_str()))?;

    service.add_path(DEVICE_INSTANCE, Item::new(identity.device_instance))?;
    service.add_path(PRODUCT_ID, Item::new(identity.product_id))?;
    service.add_path(PRODUCT_NAME, Item::new(identity.display_name.as_str()))?;
    service.add_path(DEVICE_NAME, Item::new(identity.display_name.as_str()))?;
    service.add_path(FIRMWARE_VERSION, Item::new(identity.firmware_version))?;
    service.add_path(CONNECTED, Item::new(1i64))?;
    service.add_path(SERIAL, Item::new(identity.serial.as_str()))?;

    service.add_path(MIRROR_CUSTOM_NAME, Item::new(identity.display_name.as_str()))?;
    service.add_path(MIRROR_DEVICE_INSTANCE, Item::new(identity.device_instance))?;
    service.add_path(MIRROR_FIRMWARE_VERSION, Item::new(identity.firmware_version))?;
    service.add_path(MIRROR_PRODUCT_ID, Item::new(identity.product_id))?;
    service.add_path(
        MIRROR_PRODUCT_NAME,
        Item::new(identity.mirror_product_name.as_str()),
    )?;
    service.add_path(MIRROR_SERVICE_NAME, Item::new(identity.service_name.as_str()))?;
    service.add_path(MIRROR_SERIAL, Item::new(identity.serial.as_str()))?;
    service.add_path(VREG_LINK, Item::register_link(registers))?;

    for (path, initial) in WRITEABLE_PATHS {
        service.add_path(path, Item::new(initial).writeable(on_change.clone()))?;
    }

    if energy_out {
        service.add_path(ENERGY_OUT, Item::new(BusValue::Null).writeable(on_change))?;
    }

    Ok(())
}
