//! Zenoh bridge mirroring a charger as a DC source.
//!
//! Reads its configuration from `$CHARGEMETER_CONFIG` or
//! `conf/charger_meter.json5`, writing a template there on first run.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use chargemeter_bus::{BridgeConfig, BridgeRunner, DeviceService, accept_all};
use zenoh_bridge_chargemeter::bridge::{Bridge, BridgeSettings};
use zenoh_bridge_chargemeter::config::{ChargerMeterConfig, SAMPLE_CONFIG, config_path};
use zenoh_bridge_chargemeter::model::DeviceIdentity;
use zenoh_bridge_chargemeter::paths::declare_device_paths;
use zenoh_bridge_chargemeter::vreg::DiagnosticRegisters;

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = ChargerMeterConfig::load_or_materialize(&path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    let mut runner =
        BridgeRunner::new("chargemeter", ChargerMeterConfig::get_version(), config).await?;

    let identity = DeviceIdentity::from_config(runner.config());
    let settings = BridgeSettings::from_config(runner.config());
    let energy_out = runner.config().get_publish_energy_out();

    info!(
        bridge = %runner.name(),
        config = ?path,
        service = %identity.service_name,
        instance = identity.device_instance,
        upstream = %settings.device,
        "Charger meter starting"
    );

    let service = Arc::new(DeviceService::new(
        identity.service_name.clone(),
        runner.bus(),
    ));
    declare_device_paths(
        &service,
        &identity,
        Arc::new(DiagnosticRegisters),
        accept_all(),
        energy_out,
    )?;
    service
        .register()
        .await
        .with_context(|| format!("Failed to register {}", identity.service_name))?;

    let bridge = Bridge::new(service, settings);
    runner.spawn(bridge.run());

    runner.run().await?;
    Ok(())
}
