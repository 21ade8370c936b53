//! Poll loop over a real Zenoh session.
//!
//! Note: Zenoh requires multi-thread tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use chargemeter_bus::{
    Bus, BusKeys, BusValue, DeviceService, Format, Item, ZenohBus, ZenohConfig, accept_all,
};
use zenoh_bridge_chargemeter::bridge::{Bridge, BridgeSettings};
use zenoh_bridge_chargemeter::config::ChargerMeterConfig;
use zenoh_bridge_chargemeter::model::DeviceIdentity;
use zenoh_bridge_chargemeter::paths::{self, declare_device_paths, upstream};
use zenoh_bridge_chargemeter::vreg::DiagnosticRegisters;

const CHARGER: &str = "com.victronenergy.charger.ttyUSB0";

fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}", nanos)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tick_mirrors_charger_over_zenoh() {
    let session = chargemeter_common::connect(&ZenohConfig::default())
        .await
        .expect("Failed to open Zenoh session");
    let bus = Arc::new(ZenohBus::new(
        Arc::new(session),
        BusKeys::new(unique_prefix()),
        Format::Json,
    ));

    let charger = DeviceService::new(CHARGER, bus.clone());
    charger.add_path(upstream::CURRENT, Item::new(10.0)).unwrap();
    charger.add_path(upstream::VOLTAGE, Item::new(13.5)).unwrap();
    charger.add_path(upstream::STATE, Item::new(3i64)).unwrap();
    charger.add_path(upstream::TEMPERATURE, Item::new(21i64)).unwrap();
    charger.register().await.expect("Failed to register charger");

    let config = ChargerMeterConfig::default();
    let identity = DeviceIdentity::from_config(&config);
    let service = Arc::new(DeviceService::new(identity.service_name.clone(), bus.clone()));
    declare_device_paths(
        &service,
        &identity,
        Arc::new(DiagnosticRegisters),
        accept_all(),
        false,
    )
    .unwrap();
    service.register().await.expect("Failed to register service");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let live = bus.live_participants().await.expect("Liveliness query failed");
    assert!(live.iter().any(|name| name == CHARGER));
    assert!(live.iter().any(|name| *name == identity.service_name));

    let mut bridge = Bridge::new(service.clone(), BridgeSettings::from_config(&config));
    assert!(bridge.tick().await.is_continue());

    assert_eq!(service.get(paths::CONNECTED), Some(BusValue::Integer(1)));
    assert_eq!(service.get(paths::DC_CURRENT), Some(BusValue::Float(-10.0)));
    assert_eq!(service.get(paths::DC_POWER), Some(BusValue::Float(135.0)));
    assert_eq!(service.get(paths::UPDATE_INDEX), Some(BusValue::Integer(1)));

    // The mirrored value is readable by other participants.
    let current = bus
        .read(&identity.service_name, paths::DC_CURRENT)
        .await
        .expect("Read failed");
    assert_eq!(current, Some(BusValue::Float(-10.0)));

    bus.shutdown().await;
}
