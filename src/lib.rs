//! BLE controller for Pavlok wearable stimulus devices.
//!
//! A [`DeviceSession`] finds a Pavlok by name (or connects to a known
//! address), resolves the device's characteristics and exposes its actions
//! (shock, vibrate, beep, LED blink) and read-only properties.
//!
//! ## Usage
//!
//! Here is an example on how to find the nearest Pavlok, read its battery
//! level and make it beep:
//!
//! ```rust,no_run
//! use pavlok::{ActionParams, DeviceSession, Error, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     pretty_env_logger::init();
//!
//!     // Scan on hci0 and connect to the first device named "Pavlok..."
//!     let session = DeviceSession::open(SessionConfig::default()).await?;
//!
//!     println!("Battery level: {}%", session.battery_level().await?);
//!
//!     // Beep twice at 80% of the tone range
//!     session
//!         .beep(ActionParams::default().level(80).count(2))
//!         .await?;
//!
//!     session.close().await
//! }
//!```

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use btleplug::api::BDAddr;

pub use characteristic::{build_handle_table, CharacteristicInfo, HandleTable};
pub use codec::{ActionCommand, ActionParams, LedMask, LedParams};
pub use common::{Service, SERVICE_REGISTRY};
pub use connection::{
    ChannelType, ConnectOptions, ConnectionManager, ConnectionState, PollPolicy, SecurityLevel,
};
pub use device::{DeviceSession, SessionConfig, DEFAULT_INTERFACE};
pub use error::{Error, Result};
pub use scanner::{find_by_name_prefix, Scanner, DEFAULT_NAME_PREFIX, DEFAULT_SCAN_TIMEOUT};
pub use transport::{BtleTransport, Transport};

mod characteristic;
mod connection;
mod device;
mod error;
mod scanner;
mod transport;

pub mod codec;
pub mod common;

#[cfg(test)]
mod testing;
