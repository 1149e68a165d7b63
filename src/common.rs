use std::fmt;

use btleplug::api::bleuuid::uuid_from_u16;
use uuid::Uuid;

/// Logical services exposed by a Pavlok device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Shock,
    Vibration,
    Beep,
    Led,
    BatteryLevel,
    HardwareRevision,
    FirmwareRevision,
}

impl Service {
    pub const ALL: [Service; 7] = [
        Service::Shock,
        Service::Vibration,
        Service::Beep,
        Service::Led,
        Service::BatteryLevel,
        Service::HardwareRevision,
        Service::FirmwareRevision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Service::Shock => "shock",
            Service::Vibration => "vibration",
            Service::Beep => "beep",
            Service::Led => "led",
            Service::BatteryLevel => "battery_level",
            Service::HardwareRevision => "hardware_revision",
            Service::FirmwareRevision => "firmware_revision",
        }
    }

    /// Characteristic UUID registered for this service.
    pub fn uuid(self) -> Uuid {
        match self {
            Service::Shock => characteristics::SHOCK,
            Service::Vibration => characteristics::VIBRATION,
            Service::Beep => characteristics::BEEP,
            Service::Led => characteristics::LED,
            Service::BatteryLevel => characteristics::BATTERY_LEVEL,
            Service::HardwareRevision => characteristics::HARDWARE_REVISION,
            Service::FirmwareRevision => characteristics::FIRMWARE_REVISION,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every service the controller needs, paired with its characteristic UUID.
pub const SERVICE_REGISTRY: [(Service, Uuid); 7] = [
    (Service::Shock, characteristics::SHOCK),
    (Service::Vibration, characteristics::VIBRATION),
    (Service::Beep, characteristics::BEEP),
    (Service::Led, characteristics::LED),
    (Service::BatteryLevel, characteristics::BATTERY_LEVEL),
    (Service::HardwareRevision, characteristics::HARDWARE_REVISION),
    (Service::FirmwareRevision, characteristics::FIRMWARE_REVISION),
];

pub mod characteristics {
    use super::uuid_from_u16;
    use uuid::Uuid;

    pub const SHOCK: Uuid = Uuid::from_u128(0x6e9d7a34_ddc0_4b47_9df4_fc45d2891827);
    pub const VIBRATION: Uuid = Uuid::from_u128(0x7eca7033_fc71_4a58_8775_225e813a03fb);
    pub const BEEP: Uuid = Uuid::from_u128(0xefd6fd9d_681b_4f19_9121_59900f57a401);
    pub const LED: Uuid = Uuid::from_u128(0x0102a282_7f71_4d53_85d4_c5f039491de5);

    pub const BATTERY_LEVEL: Uuid = uuid_from_u16(0x2A19);
    pub const HARDWARE_REVISION: Uuid = uuid_from_u16(0x2A27);
    pub const FIRMWARE_REVISION: Uuid = uuid_from_u16(0x2A26);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_service_once() {
        for service in Service::ALL {
            let entries: Vec<_> = SERVICE_REGISTRY
                .iter()
                .filter(|(s, _)| *s == service)
                .collect();
            assert_eq!(entries.len(), 1, "{service}");
            assert_eq!(entries[0].1, service.uuid());
        }
    }

    #[test]
    fn standard_characteristics_use_the_base_uuid() {
        assert_eq!(
            characteristics::BATTERY_LEVEL.to_string(),
            "00002a19-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            characteristics::FIRMWARE_REVISION.to_string(),
            "00002a26-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            characteristics::SHOCK.to_string(),
            "6e9d7a34-ddc0-4b47-9df4-fc45d2891827"
        );
    }
}
