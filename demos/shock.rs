//! This example connects to a Pavlok and shocks the wearer.
//! The level in percent may be given as a command line argument.

use pavlok::{ActionParams, DeviceSession, Error, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let level = std::env::args()
        .nth(1)
        .map(|arg| arg.parse().expect("Expected level in percent"))
        .unwrap_or(50);

    pretty_env_logger::init();

    let session = DeviceSession::open(SessionConfig::default().debug(true)).await?;

    session.shock(ActionParams::default().level(level)).await?;

    session.close().await
}
