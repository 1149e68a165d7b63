use std::time::Duration;

use btleplug::api::BDAddr;

use crate::characteristic::{build_handle_table, HandleTable};
use crate::codec::{ActionCommand, ActionParams, LedParams};
use crate::common::{Service, SERVICE_REGISTRY};
use crate::connection::{ConnectOptions, ConnectionManager, ConnectionState, PollPolicy};
use crate::scanner::{find_by_name_prefix, DEFAULT_NAME_PREFIX, DEFAULT_SCAN_TIMEOUT};
use crate::transport::{BtleTransport, Transport};
use crate::{Error, Result};

/// Host interface used when none is configured.
pub const DEFAULT_INTERFACE: &str = "hci0";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address of the device. Discovered by name when absent.
    address: Option<BDAddr>,
    /// Host bluetooth interface.
    interface: String,
    /// Log wire traffic at debug level instead of trace.
    debug: bool,
    connect_options: ConnectOptions,
    /// How long discovery scans for advertising devices.
    scan_timeout: Duration,
    /// Discovery picks the first device whose name starts with this.
    name_prefix: String,
    poll: PollPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: None,
            interface: DEFAULT_INTERFACE.to_string(),
            debug: false,
            connect_options: ConnectOptions::default(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Connect to this address instead of discovering one
    pub fn address(mut self, address: BDAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Host bluetooth interface, `hci0` by default
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn connect_options(mut self, options: ConnectOptions) -> Self {
        self.connect_options = options;
        self
    }

    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    fn wire_log_level(&self) -> log::Level {
        if self.debug {
            log::Level::Debug
        } else {
            log::Level::Trace
        }
    }
}

/// A connected Pavlok with all of its characteristics resolved.
///
/// Dropping the session releases the link on a best-effort basis; use
/// [`DeviceSession::close`] to observe disconnect errors.
pub struct DeviceSession<T: Transport = BtleTransport> {
    address: BDAddr,
    config: SessionConfig,
    connection: ConnectionManager<T>,
    handles: HandleTable,
}

impl DeviceSession<BtleTransport> {
    /// Opens a session through the host adapter named in the config.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let transport = BtleTransport::new(&config.interface)
            .await?
            .lookup_timeout(config.scan_timeout);
        Self::open_with(transport, config).await
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Opens a session over the given transport.
    ///
    /// Discovers the device if no address is configured, connects, and
    /// resolves every registered characteristic. Any failure tears the link
    /// down again and leaves nothing to retry but a fresh `open_with`.
    pub async fn open_with(mut transport: T, config: SessionConfig) -> Result<Self> {
        let address = match config.address {
            Some(address) => address,
            None => {
                let devices = transport.scan(config.scan_timeout).await?;
                let address = find_by_name_prefix(&devices, &config.name_prefix)
                    .ok_or(Error::DeviceNotFound)?;
                log::debug!("Found Pavlok with address {}", address);
                address
            }
        };

        let mut connection =
            ConnectionManager::new(transport, config.poll).wire_log_level(config.wire_log_level());

        let handles = match Self::establish(&mut connection, address, &config).await {
            Ok(handles) => handles,
            Err(e) => {
                if let Err(disconnect_error) = connection.disconnect().await {
                    log::warn!("Could not release {}: {}", address, disconnect_error);
                }
                return Err(e);
            }
        };

        let session = Self {
            address,
            config,
            connection,
            handles,
        };

        let hardware = session.hardware_revision().await;
        let firmware = session.firmware_revision().await;
        match (hardware, firmware) {
            (Ok(hardware), Ok(firmware)) => log::log!(
                session.config.wire_log_level(),
                "Hardware revision: {}, firmware revision: {}",
                hardware,
                firmware
            ),
            (Err(e), _) | (_, Err(e)) => {
                session.close().await.ok();
                return Err(e);
            }
        }

        Ok(session)
    }

    async fn establish(
        connection: &mut ConnectionManager<T>,
        address: BDAddr,
        config: &SessionConfig,
    ) -> Result<HandleTable> {
        if !config.connect_options.is_default() {
            log::debug!("Connect options: {:?}", config.connect_options);
        }
        connection.connect(address, &config.connect_options).await?;

        let characteristics = connection.discover_characteristics().await?;
        log::log!(
            config.wire_log_level(),
            "GATT characteristics: {:?}",
            characteristics
        );

        let handles = build_handle_table(&characteristics, &SERVICE_REGISTRY)?;
        log::log!(config.wire_log_level(), "GATT value handles: {:?}", handles);

        Ok(handles)
    }

    #[inline]
    pub fn address(&self) -> BDAddr {
        self.address
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Handles resolved for the current connection
    #[inline]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Shock the wearer. `level` is the shock intensity.
    pub async fn shock(&self, params: ActionParams) -> Result<()> {
        self.send(Service::Shock, params.encode()?).await
    }

    /// Vibrate. `level` is the vibration speed.
    pub async fn vibrate(&self, params: ActionParams) -> Result<()> {
        self.send(Service::Vibration, params.encode()?).await
    }

    /// Beep. `level` is the tone frequency.
    pub async fn beep(&self, params: ActionParams) -> Result<()> {
        self.send(Service::Beep, params.encode()?).await
    }

    /// Blink the yellow and/or red LED.
    pub async fn led(&self, params: LedParams) -> Result<()> {
        self.send(Service::Led, params.encode()?).await
    }

    /// Battery level in percent
    pub async fn battery_level(&self) -> Result<u8> {
        let data = self.read(Service::BatteryLevel).await?;
        data.first()
            .copied()
            .ok_or(Error::EmptyResponse(Service::BatteryLevel))
    }

    /// Fails with [`Error::InvalidText`] if the device sends invalid UTF-8.
    pub async fn hardware_revision(&self) -> Result<String> {
        self.read_text(Service::HardwareRevision).await
    }

    /// Fails with [`Error::InvalidText`] if the device sends invalid UTF-8.
    pub async fn firmware_revision(&self) -> Result<String> {
        self.read_text(Service::FirmwareRevision).await
    }

    /// Drops the link and connects to the same device again.
    ///
    /// Handles are resolved from scratch; on failure the session stays
    /// disconnected.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.connection.disconnect().await?;
        self.handles = HandleTable::default();

        match Self::establish(&mut self.connection, self.address, &self.config).await {
            Ok(handles) => {
                self.handles = handles;
                Ok(())
            }
            Err(e) => {
                self.connection.disconnect().await.ok();
                Err(e)
            }
        }
    }

    /// Disconnect from the device
    pub async fn close(mut self) -> Result<()> {
        self.connection.disconnect().await
    }

    async fn send(&self, service: Service, command: ActionCommand) -> Result<()> {
        self.connection.ensure_connected()?;
        let handle = self.handles.get(service)?;
        self.connection.write(handle, &command.to_bytes()).await
    }

    async fn read(&self, service: Service) -> Result<Vec<u8>> {
        self.connection.ensure_connected()?;
        let handle = self.handles.get(service)?;
        self.connection.read(handle).await
    }

    async fn read_text(&self, service: Service) -> Result<String> {
        let data = self.read(service).await?;
        let text = String::from_utf8(data).map_err(|e| Error::InvalidText(service, e))?;
        Ok(text.trim_end_matches('\0').to_string())
    }
}
