//! Scripted transport used by unit tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{BDAddr, CharPropFlags};
use uuid::Uuid;

use crate::characteristic::CharacteristicInfo;
use crate::common::{Service, SERVICE_REGISTRY};
use crate::connection::ConnectOptions;
use crate::transport::Transport;
use crate::{Error, Result};

pub(crate) fn pavlok_address() -> BDAddr {
    BDAddr::from_str("C0:FF:EE:00:00:01").unwrap()
}

/// Handle the fake assigns to a registered service.
pub(crate) fn handle_of(service: Service) -> u16 {
    let index = SERVICE_REGISTRY
        .iter()
        .position(|(s, _)| *s == service)
        .unwrap();
    0x0e + 3 * index as u16
}

/// What the fake saw, shared with the test after the transport is moved away.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub(crate) scans: u32,
    pub(crate) connects: Vec<(BDAddr, ConnectOptions)>,
    pub(crate) status_checks: u32,
    pub(crate) disconnects: u32,
    pub(crate) reads: Vec<u16>,
    pub(crate) writes: Vec<(u16, Vec<u8>)>,
}

pub(crate) struct FakeTransport {
    devices: HashMap<BDAddr, String>,
    /// Status check on which the link comes up, `None` for never.
    connected_after: Option<u32>,
    characteristics: Vec<CharacteristicInfo>,
    values: HashMap<u16, Vec<u8>>,
    fail_writes: bool,
    /// Connect attempts from this one (1-based) on fail.
    failing_connects_from: Option<usize>,
    /// Number of disconnect attempts that fail before one succeeds.
    failing_disconnects: u32,
    checks_at_connect: u32,
    probe: Arc<Mutex<Probe>>,
}

impl FakeTransport {
    /// A transport fronting a well-behaved Pavlok that connects on the first check.
    pub(crate) fn new() -> Self {
        let characteristics = SERVICE_REGISTRY
            .iter()
            .map(|(service, uuid)| CharacteristicInfo {
                uuid: *uuid,
                service_uuid: Uuid::nil(),
                value_handle: handle_of(*service),
                properties: CharPropFlags::READ | CharPropFlags::WRITE,
            })
            .collect();

        let values = HashMap::from([
            (handle_of(Service::BatteryLevel), vec![87]),
            (handle_of(Service::HardwareRevision), b"2.0".to_vec()),
            (handle_of(Service::FirmwareRevision), b"1.4.7\0".to_vec()),
        ]);

        Self {
            devices: HashMap::from([
                (BDAddr::from_str("11:22:33:44:55:66").unwrap(), "Mi Band".to_string()),
                (pavlok_address(), "Pavlok-2".to_string()),
            ]),
            connected_after: Some(1),
            characteristics,
            values,
            fail_writes: false,
            failing_connects_from: None,
            failing_disconnects: 0,
            checks_at_connect: 0,
            probe: Arc::default(),
        }
    }

    pub(crate) fn probe(&self) -> Arc<Mutex<Probe>> {
        self.probe.clone()
    }

    pub(crate) fn connected_after(mut self, checks: u32) -> Self {
        self.connected_after = Some(checks);
        self
    }

    pub(crate) fn never_connects(mut self) -> Self {
        self.connected_after = None;
        self
    }

    pub(crate) fn devices(mut self, devices: HashMap<BDAddr, String>) -> Self {
        self.devices = devices;
        self
    }

    pub(crate) fn without(mut self, service: Service) -> Self {
        let uuid = service.uuid();
        self.characteristics.retain(|c| c.uuid != uuid);
        self
    }

    pub(crate) fn value(mut self, service: Service, value: &[u8]) -> Self {
        self.values.insert(handle_of(service), value.to_vec());
        self
    }

    pub(crate) fn without_value(mut self, service: Service) -> Self {
        self.values.remove(&handle_of(service));
        self
    }

    pub(crate) fn fail_connects_from(mut self, attempt: usize) -> Self {
        self.failing_connects_from = Some(attempt);
        self
    }

    pub(crate) fn fail_disconnects(mut self, times: u32) -> Self {
        self.failing_disconnects = times;
        self
    }

    pub(crate) fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn scan(&mut self, _timeout: Duration) -> Result<HashMap<BDAddr, String>> {
        self.probe.lock().unwrap().scans += 1;
        Ok(self.devices.clone())
    }

    async fn connect(&mut self, address: BDAddr, options: &ConnectOptions) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        probe.connects.push((address, *options));
        if self
            .failing_connects_from
            .map_or(false, |from| probe.connects.len() >= from)
        {
            return Err(Error::DeviceNotFound);
        }
        self.checks_at_connect = probe.status_checks;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        let mut probe = self.probe.lock().unwrap();
        probe.status_checks += 1;
        let checks = probe.status_checks;
        drop(probe);

        Ok(self
            .connected_after
            .map_or(false, |after| checks - self.checks_at_connect >= after))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.probe.lock().unwrap().disconnects += 1;
        if self.failing_disconnects > 0 {
            self.failing_disconnects -= 1;
            return Err(Error::Transport(btleplug::Error::NotConnected));
        }
        Ok(())
    }

    async fn discover_characteristics(&mut self) -> Result<Vec<CharacteristicInfo>> {
        Ok(self.characteristics.clone())
    }

    async fn read_by_handle(&self, handle: u16) -> Result<Vec<u8>> {
        self.probe.lock().unwrap().reads.push(handle);
        self.values
            .get(&handle)
            .cloned()
            .ok_or(Error::UnknownHandle(handle))
    }

    async fn write_by_handle(&self, handle: u16, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Transport(btleplug::Error::NotConnected));
        }
        self.probe.lock().unwrap().writes.push((handle, data.to_vec()));
        Ok(())
    }
}
