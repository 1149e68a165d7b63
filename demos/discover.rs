//! This example lists named BLE devices on the given interface (hci0 by default)
//! and marks the ones that look like a Pavlok.

use pavlok::{Error, Scanner, DEFAULT_INTERFACE, DEFAULT_NAME_PREFIX};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let interface = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

    pretty_env_logger::init();

    let scanner = Scanner::new(&interface).await?;
    let devices = scanner.discover(Duration::from_secs(5)).await?;

    for (address, name) in devices {
        let marker = if name.starts_with(DEFAULT_NAME_PREFIX) { "*" } else { " " };
        println!("{} {} {}", marker, address, name);
    }

    Ok(())
}
