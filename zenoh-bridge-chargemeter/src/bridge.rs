//! Charger polling and republishing.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use chargemeter_bus::{BusValue, DeviceService, Result};

use crate::config::ChargerMeterConfig;
use crate::model::{CurrentSign, MeasurementSnapshot, UpdateIndex, UpstreamReadings};
use crate::paths::{self, upstream};

/// Settings of the polling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Charger service to mirror at startup.
    pub device: String,
    /// Prefixes accepted when the charger has to be found again.
    pub device_prefixes: Vec<String>,
    pub current_sign: CurrentSign,
    pub poll_interval: Duration,
}

impl BridgeSettings {
    pub fn from_config(config: &ChargerMeterConfig) -> Self {
        Self {
            device: config.get_device(),
            device_prefixes: config.get_device_prefixes(),
            current_sign: CurrentSign::from_invert(config.get_invert_current()),
            poll_interval: Duration::from_millis(config.get_poll_interval_ms()),
        }
    }
}

/// Mirrors one charger onto the virtual device service.
pub struct Bridge {
    service: Arc<DeviceService>,
    /// Service name of the charger currently mirrored.
    upstream: String,
    device_prefixes: Vec<String>,
    current_sign: CurrentSign,
    poll_interval: Duration,
    update_index: UpdateIndex,
}

impl Bridge {
    pub fn new(service: Arc<DeviceService>, settings: BridgeSettings) -> Self {
        Self {
            service,
            upstream: settings.device,
            device_prefixes: settings.device_prefixes,
            current_sign: settings.current_sign,
            poll_interval: settings.poll_interval,
            update_index: UpdateIndex::default(),
        }
    }

    /// Charger service currently mirrored.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn update_index(&self) -> UpdateIndex {
        self.update_index
    }

    /// Run the polling loop. Only returns if a tick asks to stop.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            upstream = %self.upstream,
            service = %self.service.name(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Starting charger poller"
        );

        loop {
            interval.tick().await;
            if self.tick().await.is_break() {
                break;
            }
        }
    }

    /// Perform a single poll cycle.
    ///
    /// Bus failures degrade the tick to the disconnected snapshot; the
    /// poller always continues.
    pub async fn tick(&mut self) -> ControlFlow<()> {
        let snapshot = match self.sample().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(upstream = %self.upstream, error = %e, "Charger poll failed");
                MeasurementSnapshot::disconnected()
            }
        };

        self.publish(&snapshot).await;

        let (index, wrapped) = self.update_index.advance();
        if wrapped {
            debug!("Update index wrapped");
        }
        self.write(paths::UPDATE_INDEX, index).await;

        ControlFlow::Continue(())
    }

    /// Read the charger, or fall back to the disconnected snapshot.
    async fn sample(&mut self) -> Result<MeasurementSnapshot> {
        let bus = self.service.bus().clone();
        let live = bus.live_participants().await?;

        if !live.iter().any(|name| *name == self.upstream) {
            self.rebind(&live);
            return Ok(MeasurementSnapshot::disconnected());
        }

        let readings = UpstreamReadings {
            current: bus.read(&self.upstream, upstream::CURRENT).await?,
            voltage: bus.read(&self.upstream, upstream::VOLTAGE).await?,
            state: bus.read(&self.upstream, upstream::STATE).await?,
            temperature: bus.read(&self.upstream, upstream::TEMPERATURE).await?,
        };

        let snapshot = MeasurementSnapshot::from_readings(&readings, self.current_sign);
        if !snapshot.connected {
            debug!(upstream = %self.upstream, "Charger present but not reporting current");
        }
        Ok(snapshot)
    }

    /// Adopt the first live charger matching a known prefix.
    fn rebind(&mut self, live: &[String]) {
        match find_by_prefix(live, &self.device_prefixes) {
            Some(name) => {
                info!(previous = %self.upstream, upstream = %name, "Charger found under new name");
                self.upstream = name.to_string();
            }
            None => {
                debug!(upstream = %self.upstream, "Charger not on bus");
            }
        }
    }

    async fn publish(&self, snapshot: &MeasurementSnapshot) {
        self.write(paths::CONNECTED, snapshot.connected).await;
        self.write(paths::STATE, snapshot.state).await;
        self.write(paths::MODE, snapshot.mode).await;
        self.write(paths::DC_VOLTAGE, snapshot.voltage).await;
        self.write(paths::DC_CURRENT, snapshot.current).await;
        self.write(paths::DC_POWER, snapshot.power).await;
        self.write(paths::DC_TEMPERATURE, snapshot.temperature).await;
    }

    async fn write(&self, path: &str, value: impl Into<BusValue>) {
        if let Err(e) = self.service.set(path, value).await {
            warn!(path = %path, error = %e, "Failed to publish");
        }
    }
}

/// First name in `live` starting with one of `prefixes`.
pub fn find_by_prefix<'a>(live: &'a [String], prefixes: &[String]) -> Option<&'a str> {
    live.iter()
        .find(|name| prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())))
        .map(String::as_str)
}
