//! Conversion of action parameters into the byte payloads the device expects.

use crate::{Error, Result};

/// Device time unit in milliseconds.
pub const TIME_UNIT_MS: u16 = 20;

/// Longest duration the device accepts for a single on/off phase.
pub const MAX_DURATION_MS: u16 = 5000;

pub const MAX_LEVEL_PERCENT: u8 = 100;

/// Converts a percentage into a device level, `floor(percent * 2.55)`.
///
/// Inputs above 100 are not rejected and truncate to a byte.
pub fn encode_level(percent: u8) -> u8 {
    (u32::from(percent) * 255 / 100) as u8
}

/// Converts milliseconds into device time units, `floor(ms / 20)`.
///
/// Inputs above [`MAX_DURATION_MS`] are not rejected and truncate to a byte.
pub fn encode_duration(milliseconds: u16) -> u8 {
    (milliseconds / TIME_UNIT_MS) as u8
}

/// Packs already encoded fields in wire order, with the LED mask last when present.
pub fn pack_action(
    count: u8,
    level: u8,
    duration_on: u8,
    duration_off: u8,
    extra: Option<u8>,
) -> Vec<u8> {
    let mut payload = vec![count, level, duration_on, duration_off];
    payload.extend(extra);
    payload
}

/// Bitmask selecting which LEDs blink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedMask(u8);

impl LedMask {
    pub const NONE: LedMask = LedMask(0);
    pub const YELLOW: LedMask = LedMask(0b0010);
    pub const RED: LedMask = LedMask(0b1000);

    pub fn from_leds(yellow: bool, red: bool) -> Self {
        let mut mask = LedMask::NONE;
        if yellow {
            mask = mask | LedMask::YELLOW;
        }
        if red {
            mask = mask | LedMask::RED;
        }
        mask
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for LedMask {
    type Output = LedMask;

    fn bitor(self, rhs: LedMask) -> LedMask {
        LedMask(self.0 | rhs.0)
    }
}

/// A single encoded command, ready to be written to a service handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCommand {
    pub count: u8,
    pub level: u8,
    pub duration_on: u8,
    pub duration_off: u8,
    pub extra: Option<u8>,
}

impl ActionCommand {
    pub fn to_bytes(&self) -> Vec<u8> {
        pack_action(
            self.count,
            self.level,
            self.duration_on,
            self.duration_off,
            self.extra,
        )
    }
}

/// Parameters shared by the shock, vibrate and beep actions.
///
/// `level` means intensity for shocks, speed for vibration and tone for beeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionParams {
    level: u8,
    count: u8,
    duration_on: u16,
    duration_off: u16,
}

impl Default for ActionParams {
    fn default() -> Self {
        Self {
            level: 50,
            count: 1,
            duration_on: 1000,
            duration_off: 1000,
        }
    }
}

impl ActionParams {
    /// Level of the action in percent
    pub fn level(mut self, percent: u8) -> Self {
        self.level = percent;
        self
    }

    /// Number of repetitions
    pub fn count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    /// Duration of each repetition in milliseconds
    pub fn duration_on(mut self, milliseconds: u16) -> Self {
        self.duration_on = milliseconds;
        self
    }

    /// Pause between repetitions in milliseconds
    pub fn duration_off(mut self, milliseconds: u16) -> Self {
        self.duration_off = milliseconds;
        self
    }

    pub fn encode(&self) -> Result<ActionCommand> {
        check_level(self.level)?;
        check_duration("duration_on", self.duration_on)?;
        check_duration("duration_off", self.duration_off)?;

        Ok(ActionCommand {
            count: self.count,
            level: encode_level(self.level),
            duration_on: encode_duration(self.duration_on),
            duration_off: encode_duration(self.duration_off),
            extra: None,
        })
    }
}

/// Parameters of the LED action. Both LEDs blink by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedParams {
    yellow: bool,
    red: bool,
    count: u8,
    duration_on: u16,
    duration_off: u16,
}

impl Default for LedParams {
    fn default() -> Self {
        Self {
            yellow: true,
            red: true,
            count: 1,
            duration_on: 1000,
            duration_off: 1000,
        }
    }
}

impl LedParams {
    pub fn yellow(mut self, enabled: bool) -> Self {
        self.yellow = enabled;
        self
    }

    pub fn red(mut self, enabled: bool) -> Self {
        self.red = enabled;
        self
    }

    pub fn count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    pub fn duration_on(mut self, milliseconds: u16) -> Self {
        self.duration_on = milliseconds;
        self
    }

    pub fn duration_off(mut self, milliseconds: u16) -> Self {
        self.duration_off = milliseconds;
        self
    }

    /// The device ignores the level of LED commands, so it is always sent at full scale.
    pub fn encode(&self) -> Result<ActionCommand> {
        check_duration("duration_on", self.duration_on)?;
        check_duration("duration_off", self.duration_off)?;

        Ok(ActionCommand {
            count: self.count,
            level: encode_level(MAX_LEVEL_PERCENT),
            duration_on: encode_duration(self.duration_on),
            duration_off: encode_duration(self.duration_off),
            extra: Some(LedMask::from_leds(self.yellow, self.red).bits()),
        })
    }
}

fn check_level(percent: u8) -> Result<()> {
    if percent > MAX_LEVEL_PERCENT {
        return Err(Error::OutOfRange {
            name: "level",
            value: percent.into(),
            max: MAX_LEVEL_PERCENT.into(),
        });
    }
    Ok(())
}

fn check_duration(name: &'static str, milliseconds: u16) -> Result<()> {
    if milliseconds > MAX_DURATION_MS {
        return Err(Error::OutOfRange {
            name,
            value: milliseconds.into(),
            max: MAX_DURATION_MS.into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds() {
        assert_eq!(encode_level(0), 0x00);
        assert_eq!(encode_level(100), 0xFF);
        assert_eq!(encode_level(50), 127);
        assert_eq!(encode_level(20), 51);
    }

    #[test]
    fn level_is_monotonic() {
        let levels: Vec<u8> = (0..=100).map(encode_level).collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn duration_is_floored_to_time_units() {
        assert_eq!(encode_duration(0), 0);
        assert_eq!(encode_duration(19), 0);
        assert_eq!(encode_duration(20), 1);
        assert_eq!(encode_duration(1000), 50);
        assert_eq!(encode_duration(5000), 250);
        for ms in 0..=MAX_DURATION_MS {
            assert_eq!(u16::from(encode_duration(ms)), ms / 20);
        }
    }

    #[test]
    fn default_shock_payload() {
        let command = ActionParams::default().encode().unwrap();
        assert_eq!(command.to_bytes(), vec![1, 127, 50, 50]);
    }

    #[test]
    fn led_payload_with_yellow_only() {
        let command = LedParams::default()
            .red(false)
            .count(2)
            .duration_on(200)
            .duration_off(400)
            .encode()
            .unwrap();
        assert_eq!(command.to_bytes(), vec![2, 255, 10, 20, 2]);
    }

    #[test]
    fn led_masks() {
        assert_eq!(LedMask::from_leds(true, true).bits(), 10);
        assert_eq!(LedMask::from_leds(false, true).bits(), 8);
        assert_eq!(LedMask::from_leds(false, false).bits(), 0);
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let err = ActionParams::default().level(101).encode().unwrap_err();
        assert!(matches!(err, Error::OutOfRange { name: "level", value: 101, max: 100 }));

        let err = ActionParams::default().duration_off(5001).encode().unwrap_err();
        assert!(matches!(err, Error::OutOfRange { name: "duration_off", .. }));

        let err = LedParams::default().duration_on(6000).encode().unwrap_err();
        assert!(matches!(err, Error::OutOfRange { name: "duration_on", .. }));
    }

    #[test]
    fn pack_appends_extra_byte_only_when_given() {
        assert_eq!(pack_action(3, 1, 2, 4, None), vec![3, 1, 2, 4]);
        assert_eq!(pack_action(3, 1, 2, 4, Some(8)), vec![3, 1, 2, 4, 8]);
    }
}
