use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{BDAddr, Characteristic as BtleCharacteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tokio::task::JoinHandle;

use crate::characteristic::CharacteristicInfo;
use crate::connection::ConnectOptions;
use crate::scanner::{Scanner, DEFAULT_SCAN_TIMEOUT};
use crate::{Error, Result};

/// Link-level operations a device session is built on.
///
/// Implementations handle one remote device at a time. Handles returned by
/// [`Transport::discover_characteristics`] stay valid until the next
/// disconnect.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Scans for advertising devices, returning address and name of each.
    async fn scan(&mut self, timeout: Duration) -> Result<HashMap<BDAddr, String>>;

    /// Starts connecting without waiting for the link to come up.
    async fn connect(&mut self, address: BDAddr, options: &ConnectOptions) -> Result<()>;

    async fn is_connected(&self) -> Result<bool>;

    /// Tears down the link and forgets all handles.
    async fn disconnect(&mut self) -> Result<()>;

    async fn discover_characteristics(&mut self) -> Result<Vec<CharacteristicInfo>>;

    async fn read_by_handle(&self, handle: u16) -> Result<Vec<u8>>;

    async fn write_by_handle(&self, handle: u16, data: &[u8]) -> Result<()>;
}

/// [`Transport`] backed by the platform bluetooth stack through `btleplug`.
///
/// btleplug does not expose attribute handles, so characteristics are
/// numbered from 1 in the order the stack enumerates them.
pub struct BtleTransport {
    scanner: Scanner,
    /// How long `connect` scans for a device the host stack does not know yet.
    lookup_timeout: Duration,
    peripheral: Option<Peripheral>,
    pending_connect: Option<JoinHandle<()>>,
    characteristics: Vec<BtleCharacteristic>,
}

impl BtleTransport {
    /// Opens the host adapter named `interface`, e.g. `hci0`.
    pub async fn new(interface: &str) -> Result<Self> {
        Ok(Self::with_scanner(Scanner::new(interface).await?))
    }

    pub fn with_scanner(scanner: Scanner) -> Self {
        Self {
            scanner,
            lookup_timeout: DEFAULT_SCAN_TIMEOUT,
            peripheral: None,
            pending_connect: None,
            characteristics: Vec::new(),
        }
    }

    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    fn peripheral(&self) -> Result<&Peripheral> {
        self.peripheral.as_ref().ok_or(Error::NotConnected)
    }

    fn characteristic(&self, handle: u16) -> Result<&BtleCharacteristic> {
        usize::from(handle)
            .checked_sub(1)
            .and_then(|index| self.characteristics.get(index))
            .ok_or(Error::UnknownHandle(handle))
    }
}

#[async_trait]
impl Transport for BtleTransport {
    async fn scan(&mut self, timeout: Duration) -> Result<HashMap<BDAddr, String>> {
        self.scanner.discover(timeout).await
    }

    async fn connect(&mut self, address: BDAddr, options: &ConnectOptions) -> Result<()> {
        if self.peripheral.is_some() {
            self.disconnect().await?;
        }

        let peripheral = self
            .scanner
            .find_peripheral(address, self.lookup_timeout)
            .await?
            .ok_or(Error::DeviceNotFound)?;

        if !options.is_default() {
            log::debug!(
                "Link parameters are negotiated by the host stack, not applying {:?}",
                options
            );
        }

        log::debug!("Connecting to device {}", address);

        // Connect in another task so the caller can poll the link state meanwhile.
        let peripheral_clone = peripheral.clone();
        self.pending_connect = Some(tokio::spawn(async move {
            if let Err(e) = peripheral_clone.connect().await {
                log::warn!(
                    "Could not connect to {}: {:?}",
                    peripheral_clone.address(),
                    e
                );
            }
        }));
        self.peripheral = Some(peripheral);

        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral()?.is_connected().await?)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pending) = self.pending_connect.take() {
            pending.abort();
        }
        self.characteristics.clear();

        // Kept until the disconnect succeeds so a retry or drop can still release it.
        if let Some(peripheral) = self.peripheral.as_ref() {
            if peripheral.is_connected().await.unwrap_or(true) {
                peripheral.disconnect().await?;
            }
        }
        self.peripheral = None;

        Ok(())
    }

    async fn discover_characteristics(&mut self) -> Result<Vec<CharacteristicInfo>> {
        let peripheral = self.peripheral()?.clone();

        let mut characteristics = peripheral.characteristics();
        if characteristics.is_empty() {
            log::debug!("Discovering characteristics for {}", peripheral.address());
            peripheral.discover_services().await?;
            characteristics = peripheral.characteristics();
        }

        self.characteristics = characteristics.into_iter().collect();

        Ok(self
            .characteristics
            .iter()
            .zip(1u16..)
            .map(|(characteristic, value_handle)| CharacteristicInfo {
                uuid: characteristic.uuid,
                service_uuid: characteristic.service_uuid,
                value_handle,
                properties: characteristic.properties,
            })
            .collect())
    }

    async fn read_by_handle(&self, handle: u16) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(handle)?;
        Ok(self.peripheral()?.read(characteristic).await?)
    }

    async fn write_by_handle(&self, handle: u16, data: &[u8]) -> Result<()> {
        let characteristic = self.characteristic(handle)?;
        self.peripheral()?
            .write(characteristic, data, WriteType::WithResponse)
            .await?;
        Ok(())
    }
}

impl Drop for BtleTransport {
    fn drop(&mut self) {
        if let Some(pending) = self.pending_connect.take() {
            pending.abort();
        }

        let Some(peripheral) = self.peripheral.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        log::warn!("Could not disconnect {}: {:?}", peripheral.address(), e);
                    }
                });
            }
            Err(_) => log::warn!(
                "Dropped outside of a runtime, {} may stay connected",
                peripheral.address()
            ),
        }
    }
}
