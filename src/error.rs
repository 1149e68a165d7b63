use crate::common::Service;

/// Errors produced while opening or driving a device session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Discovery found no device whose name matches the configured prefix.
    #[error("no Pavlok device found")]
    DeviceNotFound,

    /// No host adapter matches the requested interface name.
    #[error("bluetooth adapter {0:?} not found")]
    AdapterNotFound(String),

    /// The device did not report a connection within the poll budget.
    #[error("device did not connect after {attempts} status checks")]
    ConnectionTimeout { attempts: u32 },

    /// The device does not expose a characteristic this controller needs.
    #[error("device does not expose the {0} characteristic")]
    MissingCharacteristic(Service),

    #[error("no characteristic with handle {0:#06x}")]
    UnknownHandle(u16),

    #[error("not connected")]
    NotConnected,

    /// An action parameter is outside what the device accepts.
    #[error("{name} must be at most {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        max: u32,
    },

    #[error("invalid {kind}: {value:?}")]
    InvalidOption { kind: &'static str, value: String },

    /// A text property is not valid UTF-8.
    #[error("{0} characteristic returned invalid UTF-8")]
    InvalidText(Service, #[source] std::string::FromUtf8Error),

    /// A property read returned no bytes.
    #[error("empty response from the {0} characteristic")]
    EmptyResponse(Service),

    /// Low-level failure reported by the bluetooth stack.
    #[error(transparent)]
    Transport(#[from] btleplug::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
