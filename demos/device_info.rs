//! This example connects to a Pavlok with given address and prints its
//! battery level and revisions, then blinks the red LED.

use pavlok::{BDAddr, DeviceSession, Error, LedParams, SessionConfig};
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let address = std::env::args()
        .nth(1)
        .expect("Expected address in format XX:XX:XX:XX:XX:XX");
    let address = BDAddr::from_str(&address).expect("Invalid address");

    pretty_env_logger::init();

    let config = SessionConfig::default().address(address);
    let session = DeviceSession::open(config).await?;

    println!("Battery level: {}%", session.battery_level().await?);
    println!("Hardware revision: {}", session.hardware_revision().await?);
    println!("Firmware revision: {}", session.firmware_revision().await?);

    session
        .led(LedParams::default().yellow(false).count(3).duration_on(200))
        .await?;

    session.close().await
}
