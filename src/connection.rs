use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use btleplug::api::BDAddr;
use tokio::sync::Mutex;

use crate::characteristic::CharacteristicInfo;
use crate::transport::Transport;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl FromStr for SecurityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(SecurityLevel::Low),
            "medium" => Ok(SecurityLevel::Medium),
            "high" => Ok(SecurityLevel::High),
            _ => Err(Error::InvalidOption {
                kind: "security level",
                value: s.to_string(),
            }),
        }
    }
}

/// Address type used to reach the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelType {
    #[default]
    Public,
    Random,
}

impl FromStr for ChannelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(ChannelType::Public),
            "random" => Ok(ChannelType::Random),
            _ => Err(Error::InvalidOption {
                kind: "channel type",
                value: s.to_string(),
            }),
        }
    }
}

/// Link parameters passed along with a connect request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub security_level: SecurityLevel,
    pub channel_type: ChannelType,
    pub mtu: Option<u16>,
    /// Connection-oriented channel to use instead of the fixed attribute channel.
    pub psm: Option<u16>,
}

impl ConnectOptions {
    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn channel_type(mut self, channel_type: ChannelType) -> Self {
        self.channel_type = channel_type;
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn psm(mut self, psm: u16) -> Self {
        self.psm = Some(psm);
        self
    }

    pub fn is_default(&self) -> bool {
        *self == ConnectOptions::default()
    }
}

/// How often and how many times the link state is checked after a connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            attempts: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Owns a transport and tracks the lifecycle of its link.
///
/// Reads and writes go through a mutex so that concurrent callers never
/// have more than one request in flight.
pub struct ConnectionManager<T> {
    transport: Mutex<T>,
    state: ConnectionState,
    policy: PollPolicy,
    wire_log_level: log::Level,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, policy: PollPolicy) -> Self {
        Self {
            transport: Mutex::new(transport),
            state: ConnectionState::Disconnected,
            policy,
            wire_log_level: log::Level::Trace,
        }
    }

    /// Log level of per-request payload traces
    pub fn wire_log_level(mut self, level: log::Level) -> Self {
        self.wire_log_level = level;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Issues a connect and waits until the transport reports the link as up.
    ///
    /// Fails with [`Error::ConnectionTimeout`] once the poll budget is spent.
    /// The transport is left as is on failure; call [`Self::disconnect`] to release it.
    ///
    /// A link left over from an earlier connect is released first.
    pub async fn connect(&mut self, address: BDAddr, options: &ConnectOptions) -> Result<()> {
        self.disconnect().await?;
        self.state = ConnectionState::Connecting;

        let result = match self.transport.get_mut().connect(address, options).await {
            Ok(()) => self.wait_until_connected().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(polls) => {
                log::info!("Connected to {} after {} status checks", address, polls);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                log::warn!("Could not connect to {}: {}", address, e);
                self.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    /// Returns the number of status checks it took to see the link up.
    async fn wait_until_connected(&mut self) -> Result<u32> {
        let transport = self.transport.get_mut();

        for attempt in 1..=self.policy.attempts {
            if transport.is_connected().await? {
                return Ok(attempt);
            }
            tokio::time::sleep(self.policy.interval).await;
        }

        Err(Error::ConnectionTimeout {
            attempts: self.policy.attempts,
        })
    }

    /// Releases the link. Safe to call in any state.
    ///
    /// If the transport fails to release it, the state becomes
    /// [`ConnectionState::Failed`] so a later call tries again.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Disconnected {
            return Ok(());
        }

        match self.transport.get_mut().disconnect().await {
            Ok(()) => {
                self.state = ConnectionState::Disconnected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    pub async fn discover_characteristics(&mut self) -> Result<Vec<CharacteristicInfo>> {
        self.ensure_connected()?;
        self.transport.get_mut().discover_characteristics().await
    }

    pub async fn read(&self, handle: u16) -> Result<Vec<u8>> {
        self.ensure_connected()?;

        let data = self.transport.lock().await.read_by_handle(handle).await?;
        log::log!(
            self.wire_log_level,
            "read: handle {:#06x}, data {}",
            handle,
            hex(&data)
        );
        Ok(data)
    }

    pub async fn write(&self, handle: u16, data: &[u8]) -> Result<()> {
        self.ensure_connected()?;

        log::log!(
            self.wire_log_level,
            "write: handle {:#06x}, data {}",
            handle,
            hex(data)
        );
        self.transport.lock().await.write_by_handle(handle, data).await
    }

    /// Fails with [`Error::NotConnected`] unless the link is up.
    pub fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
