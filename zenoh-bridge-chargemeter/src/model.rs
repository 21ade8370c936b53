//! Data published by the bridge.

use chargemeter_common::BusValue;

use crate::config::ChargerMeterConfig;

/// `/Mode` while the charger is reporting.
pub const MODE_ON: i64 = 1;

/// `/Mode` while disconnected.
pub const MODE_OFF: i64 = 4;

/// `/State` while disconnected.
pub const STATE_OFF: i64 = 0;

/// Identity of the virtual device on the bus. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub service_name: String,
    pub device_instance: u32,
    pub display_name: String,
    pub serial: String,
    pub product_id: u32,
    pub firmware_version: u32,
    /// Product name reported by the `/Devices/0` sub-device.
    pub mirror_product_name: String,
    pub process_name: String,
    pub process_version: String,
    pub connection: String,
}

impl DeviceIdentity {
    pub const SERIAL: &'static str = "HQ2084P4XX";
    pub const PRODUCT_ID: u32 = 0xA389;
    pub const FIRMWARE_VERSION: u32 = 0x0416;
    pub const MIRROR_PRODUCT_NAME: &'static str = "Virtual AC Energy Meter";
    pub const CONNECTION: &'static str = "Zenoh";

    pub fn from_config(config: &ChargerMeterConfig) -> Self {
        Self {
            service_name: config.get_service_name(),
            device_instance: config.get_device_instance(),
            display_name: config.get_product_name(),
            serial: Self::SERIAL.to_string(),
            product_id: Self::PRODUCT_ID,
            firmware_version: Self::FIRMWARE_VERSION,
            mirror_product_name: Self::MIRROR_PRODUCT_NAME.to_string(),
            process_name: env!("CARGO_PKG_NAME").to_string(),
            process_version: ChargerMeterConfig::get_version().to_string(),
            connection: Self::CONNECTION.to_string(),
        }
    }
}

/// Sign convention of the republished current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CurrentSign {
    /// Negate the charger current.
    #[default]
    Inverted,
    /// Republish the charger current as read.
    PassThrough,
}

impl CurrentSign {
    pub fn from_invert(invert: bool) -> Self {
        if invert {
            CurrentSign::Inverted
        } else {
            CurrentSign::PassThrough
        }
    }

    pub fn apply(self, current: f64) -> f64 {
        match self {
            CurrentSign::Inverted => -current,
            CurrentSign::PassThrough => current,
        }
    }
}

/// Raw attribute values read from the charger in one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamReadings {
    pub current: Option<BusValue>,
    pub voltage: Option<BusValue>,
    pub state: Option<BusValue>,
    pub temperature: Option<BusValue>,
}

/// What one tick publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSnapshot {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub temperature: Option<f64>,
    pub state: Option<i64>,
    pub connected: bool,
    pub mode: i64,
}

impl MeasurementSnapshot {
    /// Snapshot published while the charger is absent or silent.
    pub fn disconnected() -> Self {
        Self {
            voltage: None,
            current: None,
            power: None,
            temperature: None,
            state: Some(STATE_OFF),
            connected: false,
            mode: MODE_OFF,
        }
    }

    /// Transform charger readings.
    ///
    /// Without a numeric current the charger is treated as not yet
    /// reporting. Power always uses the charger's own current sign.
    pub fn from_readings(readings: &UpstreamReadings, sign: CurrentSign) -> Self {
        let Some(current) = readings.current.as_ref().and_then(BusValue::as_f64) else {
            return Self::disconnected();
        };
        let voltage = readings.voltage.as_ref().and_then(BusValue::as_f64);

        Self {
            voltage,
            current: Some(sign.apply(current)),
            power: voltage.map(|v| current * v),
            temperature: readings.temperature.as_ref().and_then(BusValue::as_f64),
            state: readings.state.as_ref().and_then(BusValue::as_i64),
            connected: true,
            mode: MODE_ON,
        }
    }
}

/// Tick counter published as `/UpdateIndex`, wrapping from 255 to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateIndex(u8);

impl UpdateIndex {
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Step to the next index. Returns the new value and whether it wrapped.
    pub fn advance(&mut self) -> (u8, bool) {
        let (next, wrapped) = self.0.overflowing_add(1);
        self.0 = next;
        (next, wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(current: BusValue, voltage: BusValue) -> UpstreamReadings {
        UpstreamReadings {
            current: Some(current),
            voltage: Some(voltage),
            state: Some(BusValue::Integer(3)),
            temperature: Some(BusValue::Integer(21)),
        }
    }

    #[test]
    fn test_disconnected_snapshot() {
        let snapshot = MeasurementSnapshot::disconnected();
        assert!(!snapshot.connected);
        assert_eq!(snapshot.state, Some(0));
        assert_eq!(snapshot.mode, 4);
        assert_eq!(snapshot.voltage, None);
        assert_eq!(snapshot.current, None);
        assert_eq!(snapshot.power, None);
        assert_eq!(snapshot.temperature, None);
    }

    #[test]
    fn test_inverted_current_keeps_power_sign() {
        let snapshot = MeasurementSnapshot::from_readings(
            &readings(BusValue::Float(10.0), BusValue::Float(13.5)),
            CurrentSign::Inverted,
        );

        assert!(snapshot.connected);
        assert_eq!(snapshot.mode, MODE_ON);
        assert_eq!(snapshot.voltage, Some(13.5));
        assert_eq!(snapshot.current, Some(-10.0));
        assert_eq!(snapshot.power, Some(135.0));
        assert_eq!(snapshot.temperature, Some(21.0));
        assert_eq!(snapshot.state, Some(3));
    }

    #[test]
    fn test_pass_through_current() {
        let snapshot = MeasurementSnapshot::from_readings(
            &readings(BusValue::Float(-2.0), BusValue::Float(12.0)),
            CurrentSign::PassThrough,
        );
        assert_eq!(snapshot.current, Some(-2.0));
        assert_eq!(snapshot.power, Some(-24.0));
    }

    #[test]
    fn test_null_current_is_disconnected() {
        let snapshot = MeasurementSnapshot::from_readings(
            &readings(BusValue::Null, BusValue::Float(12.0)),
            CurrentSign::Inverted,
        );
        assert_eq!(snapshot, MeasurementSnapshot::disconnected());

        let snapshot =
            MeasurementSnapshot::from_readings(&UpstreamReadings::default(), CurrentSign::Inverted);
        assert_eq!(snapshot, MeasurementSnapshot::disconnected());
    }

    #[test]
    fn test_missing_voltage_stays_connected_with_null_power() {
        let snapshot = MeasurementSnapshot::from_readings(
            &UpstreamReadings {
                current: Some(BusValue::Float(4.0)),
                ..Default::default()
            },
            CurrentSign::Inverted,
        );
        assert!(snapshot.connected);
        assert_eq!(snapshot.current, Some(-4.0));
        assert_eq!(snapshot.voltage, None);
        assert_eq!(snapshot.power, None);
        assert_eq!(snapshot.state, None);
    }

    #[test]
    fn test_update_index_wraps() {
        let mut index = UpdateIndex::new(254);
        assert_eq!(index.advance(), (255, false));
        assert_eq!(index.advance(), (0, true));
        assert_eq!(index.advance(), (1, false));
    }

    #[test]
    fn test_current_sign_from_flag() {
        assert_eq!(CurrentSign::from_invert(true), CurrentSign::Inverted);
        assert_eq!(CurrentSign::from_invert(false), CurrentSign::PassThrough);
        assert_eq!(CurrentSign::default().apply(1.5), -1.5);
    }
}
