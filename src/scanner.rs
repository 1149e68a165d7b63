use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{Stream, StreamExt};
use stream_cancel::Valved;

use crate::{Error, Result};

/// Scan window used when no other timeout is configured.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(3);

/// Name prefix advertised by Pavlok devices.
pub const DEFAULT_NAME_PREFIX: &str = "Pavlok";

pub(crate) struct Session {
    pub(crate) _manager: Manager,
    pub(crate) adapter: Adapter,
}

/// Scans for advertising devices on a single host adapter.
#[derive(Clone)]
pub struct Scanner {
    session: Arc<Session>,
}

impl Scanner {
    /// Opens the adapter whose info string starts with `interface`, e.g. `hci0`.
    pub async fn new(interface: &str) -> Result<Self> {
        let manager = Manager::new().await?;

        let mut selected = None;
        for adapter in manager.adapters().await? {
            let info = adapter.adapter_info().await?;
            log::trace!("Found adapter: {}", info);

            if info.split_whitespace().next() == Some(interface) {
                selected = Some(adapter);
                break;
            }
        }

        let adapter = selected.ok_or_else(|| Error::AdapterNotFound(interface.to_string()))?;

        log::trace!("Using adapter: {:?}", adapter);

        Ok(Self {
            session: Arc::new(Session {
                _manager: manager,
                adapter,
            }),
        })
    }

    /// Scans for `timeout` and returns the address and name of every named device seen.
    pub async fn discover(&self, timeout: Duration) -> Result<HashMap<BDAddr, String>> {
        let mut devices = HashMap::new();

        self.listen(timeout, |peripheral, name| {
            if let Some(name) = name {
                devices.insert(peripheral.address(), name);
            }
            false
        })
        .await?;

        // Peripherals cached by the host stack do not always produce a fresh event.
        for peripheral in self.session.adapter.peripherals().await? {
            if let Some(name) = local_name(&peripheral).await {
                devices.entry(peripheral.address()).or_insert(name);
            }
        }

        log::debug!("Discovered {} named devices", devices.len());

        Ok(devices)
    }

    /// Looks up a peripheral by address, scanning for up to `timeout` if the
    /// host stack does not know it yet.
    pub(crate) async fn find_peripheral(
        &self,
        address: BDAddr,
        timeout: Duration,
    ) -> Result<Option<Peripheral>> {
        let known = self
            .session
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address() == address);
        if known.is_some() {
            return Ok(known);
        }

        log::debug!("Device {} is not known yet, scanning for it", address);

        let mut found = None;
        self.listen(timeout, |peripheral, _| {
            if peripheral.address() == address {
                found = Some(peripheral.clone());
                true
            } else {
                false
            }
        })
        .await?;

        Ok(found)
    }

    /// Feeds discovered and updated peripherals to `on_peripheral` until it
    /// returns true or the timeout elapses.
    async fn listen(
        &self,
        timeout: Duration,
        mut on_peripheral: impl FnMut(&Peripheral, Option<String>) -> bool,
    ) -> Result<()> {
        let adapter = &self.session.adapter;

        log::info!("Starting the scan");

        let events: Pin<Box<dyn Stream<Item = CentralEvent> + Send>> = adapter.events().await?;
        let (stopper, mut events) = Valved::new(events);

        adapter.start_scan(ScanFilter::default()).await?;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            drop(stopper);
        });

        while let Some(event) = events.next().await {
            let peripheral_id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };

            if let Ok(peripheral) = adapter.peripheral(&peripheral_id).await {
                log::trace!("Device seen: {:?}", peripheral);

                let name = local_name(&peripheral).await;
                if on_peripheral(&peripheral, name) {
                    log::info!("Scanner stop condition reached.");
                    break;
                }
            }
        }

        timer.abort();
        adapter.stop_scan().await?;

        log::info!("Scanner was stopped.");

        Ok(())
    }
}

/// Local name of the peripheral, if it advertises one
async fn local_name(peripheral: &Peripheral) -> Option<String> {
    peripheral
        .properties()
        .await
        .ok()
        .flatten()
        .and_then(|props| props.local_name)
}

/// Returns the first device whose name starts with `prefix`.
///
/// Iteration order of `devices` is unspecified, so with several matching
/// devices any one of them may be returned.
pub fn find_by_name_prefix(devices: &HashMap<BDAddr, String>, prefix: &str) -> Option<BDAddr> {
    devices
        .iter()
        .find(|(_, name)| name.starts_with(prefix))
        .map(|(address, _)| *address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(s: &str) -> BDAddr {
        BDAddr::from_str(s).unwrap()
    }

    #[test]
    fn finds_device_by_prefix() {
        let devices = HashMap::from([
            (addr("11:22:33:44:55:66"), "Fitbit".to_string()),
            (addr("AA:BB:CC:DD:EE:FF"), "Pavlok-2".to_string()),
        ]);

        assert_eq!(
            find_by_name_prefix(&devices, DEFAULT_NAME_PREFIX),
            Some(addr("AA:BB:CC:DD:EE:FF"))
        );
    }

    #[test]
    fn no_match_yields_none() {
        let devices = HashMap::from([(addr("11:22:33:44:55:66"), "MyPavlok".to_string())]);

        assert_eq!(find_by_name_prefix(&devices, DEFAULT_NAME_PREFIX), None);
        assert_eq!(find_by_name_prefix(&HashMap::new(), DEFAULT_NAME_PREFIX), None);
    }
}
