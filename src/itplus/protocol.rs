//! # IT+ Protocol Constants and Types
//!
//! Core protocol definitions for La Crosse IT+ sensor frames.
//!
//! ## Frame Layout
//!
//! ```text
//! Byte 0: LLLL IIII   L = length nibble (always 0x9), I = identity bits 5..2
//! Byte 1: IIRx TTTT   I = identity bits 1..0, R = reset flag, T = temperature tens
//! Byte 2: TTTT DDDD   T = temperature units, D = tenths
//! Byte 3: BHHH HHHH   B = low battery, H = humidity (106 = no hygrometer)
//! Byte 4: CCCC CCCC   C = CRC-8 (poly 0x31) over bytes 0-3
//! ```

use std::fmt;

use crate::error::{ItPlusError, Result};

/// IT+ frame size in bytes (including the CRC byte)
pub const ITPLUS_FRAME_SIZE: usize = 5;

/// Declared length nibble carried in the high nibble of byte 0
pub const ITPLUS_LENGTH_NIBBLE: u8 = 0x9;

/// Identity bits used for matching (6-bit sensor identity)
pub const ITPLUS_ID_MASK: u8 = 0b0011_1111;

/// Bit of a stored identity that holds the "sensor was reset" flag
pub const ITPLUS_RESET_FLAG: u8 = 0b0100_0000;

/// Offset the sensor adds to the temperature before transmission
pub const ITPLUS_TEMP_OFFSET: u8 = 40;

/// Sign bit of the whole-degree temperature byte
pub const ITPLUS_TEMP_SIGN: u8 = 0b1000_0000;

/// Humidity value sent by sensors without a hygrometer
/// (the reading is a secondary temperature channel)
pub const ITPLUS_NO_HUMIDITY: u8 = 106;

/// Raw 5-byte frame as delivered by the radio layer
pub type RawFrame = [u8; ITPLUS_FRAME_SIZE];

/// Convert an arbitrary byte slice into a [`RawFrame`]
///
/// # Errors
///
/// Returns [`ItPlusError::MalformedFrame`] if the slice is not exactly
/// [`ITPLUS_FRAME_SIZE`] bytes long.
pub fn raw_frame_from_slice(bytes: &[u8]) -> Result<RawFrame> {
    <RawFrame>::try_from(bytes).map_err(|_| {
        ItPlusError::MalformedFrame(format!(
            "expected {} bytes, got {}",
            ITPLUS_FRAME_SIZE,
            bytes.len()
        ))
    })
}

/// Sensor identity with the reset flag embedded in bit 6
///
/// Matching always goes through [`SensorId::masked`]; the reset bit is only
/// kept for display of discovered sensors ([`SensorId::raw`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorId(u8);

impl SensorId {
    /// Build an identity from its 6-bit value and the reset flag
    pub fn new(id: u8, reset: bool) -> Self {
        let flag = if reset { ITPLUS_RESET_FLAG } else { 0 };
        Self((id & ITPLUS_ID_MASK) | flag)
    }

    /// Build an identity from a stored byte, keeping the reset bit
    pub fn from_raw(raw: u8) -> Self {
        Self(raw & (ITPLUS_ID_MASK | ITPLUS_RESET_FLAG))
    }

    /// 6-bit identity used as the matching key
    pub fn masked(self) -> u8 {
        self.0 & ITPLUS_ID_MASK
    }

    /// Identity including the reset bit
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Whether the sensor announced a reset (battery replaced)
    pub fn has_reset_flag(self) -> bool {
        self.0 & ITPLUS_RESET_FLAG != 0
    }

    /// Compare two identities ignoring the reset flag
    pub fn matches(self, other: SensorId) -> bool {
        self.masked() == other.masked()
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.masked())?;
        if self.has_reset_flag() {
            write!(f, "R")?;
        }
        Ok(())
    }
}

/// Temperature in the sensor's sign-magnitude encoding
///
/// `whole` carries the magnitude in bits 0-6 and the sign in bit 7, exactly
/// as the receiver firmware stores it. `tenths` is always 0-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Temperature {
    /// Whole degrees, bit 7 set for negative values
    pub whole: u8,

    /// Tenths of a degree (0-9)
    pub tenths: u8,
}

impl Temperature {
    /// Build a temperature from sign, magnitude and tenths
    pub fn new(negative: bool, magnitude: u8, tenths: u8) -> Self {
        let sign = if negative { ITPLUS_TEMP_SIGN } else { 0 };
        Self {
            whole: (magnitude & !ITPLUS_TEMP_SIGN) | sign,
            tenths,
        }
    }

    /// Whether the sign bit is set
    pub fn is_negative(self) -> bool {
        self.whole & ITPLUS_TEMP_SIGN != 0
    }

    /// Whole-degree magnitude with the sign bit masked off
    pub fn magnitude(self) -> u8 {
        self.whole & !ITPLUS_TEMP_SIGN
    }

    /// Temperature in tenths of a degree Celsius
    pub fn as_tenths(self) -> i16 {
        let value = self.magnitude() as i16 * 10 + self.tenths as i16;
        if self.is_negative() {
            -value
        } else {
            value
        }
    }

    /// Temperature in degrees Celsius
    pub fn as_celsius(self) -> f32 {
        self.as_tenths() as f32 / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{}", sign, self.magnitude(), self.tenths)
    }
}

/// Humidity byte (7 bits) as sent by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Humidity(pub u8);

impl Humidity {
    /// Whether this is the "no hygrometer / secondary channel" marker
    pub fn is_secondary_channel(self) -> bool {
        self.0 == ITPLUS_NO_HUMIDITY
    }

    /// Relative humidity in percent, or `None` for the secondary channel marker
    pub fn percent(self) -> Option<u8> {
        if self.is_secondary_channel() {
            None
        } else {
            Some(self.0)
        }
    }
}

/// Reading decoded from one valid IT+ frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedReading {
    /// 6-bit sensor identity
    pub sensor_id: u8,

    /// Sensor was reset (new identity after battery change)
    pub reset: bool,

    /// Offset- and sign-corrected temperature
    pub temperature: Temperature,

    /// Humidity or secondary channel marker
    pub humidity: Humidity,

    /// Weak battery indicator
    pub low_battery: bool,
}

impl DecodedReading {
    /// Identity with the reset flag folded into bit 6
    pub fn identity(&self) -> SensorId {
        SensorId::new(self.sensor_id, self.reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(ITPLUS_FRAME_SIZE, 5);
        assert_eq!(ITPLUS_LENGTH_NIBBLE, 0x9);
        assert_eq!(ITPLUS_ID_MASK, 0x3F);
        assert_eq!(ITPLUS_RESET_FLAG, 0x40);
        assert_eq!(ITPLUS_NO_HUMIDITY, 106);
    }

    #[test]
    fn test_raw_frame_from_slice() {
        let frame = raw_frame_from_slice(&[0x9F, 0x23, 0x18, 0x45, 0x65]).unwrap();
        assert_eq!(frame, [0x9F, 0x23, 0x18, 0x45, 0x65]);

        assert!(raw_frame_from_slice(&[0x9F, 0x23]).is_err());
        assert!(raw_frame_from_slice(&[0u8; 6]).is_err());
    }

    #[test]
    fn test_sensor_id_masking() {
        let id = SensorId::new(0x3C, true);
        assert_eq!(id.raw(), 0x7C);
        assert_eq!(id.masked(), 0x3C);
        assert!(id.has_reset_flag());

        let plain = SensorId::new(0x3C, false);
        assert!(id.matches(plain));
        assert_ne!(id, plain);
    }

    #[test]
    fn test_sensor_id_drops_extra_bits() {
        let id = SensorId::new(0xFF, false);
        assert_eq!(id.raw(), 0x3F);

        let id = SensorId::from_raw(0xFF);
        assert_eq!(id.raw(), 0x7F);
        assert!(id.has_reset_flag());
    }

    #[test]
    fn test_sensor_id_display() {
        assert_eq!(SensorId::new(0x05, false).to_string(), "0x05");
        assert_eq!(SensorId::new(0x3C, true).to_string(), "0x3CR");
    }

    #[test]
    fn test_temperature_sign_encoding() {
        let t = Temperature::new(true, 8, 2);
        assert_eq!(t.whole, 0x88);
        assert!(t.is_negative());
        assert_eq!(t.magnitude(), 8);
        assert_eq!(t.as_tenths(), -82);
        assert!((t.as_celsius() + 8.2).abs() < 0.001);
        assert_eq!(t.to_string(), "-8.2");

        let t = Temperature::new(false, 21, 3);
        assert_eq!(t.whole, 21);
        assert_eq!(t.as_tenths(), 213);
        assert_eq!(t.to_string(), "21.3");
    }

    #[test]
    fn test_humidity_marker() {
        assert_eq!(Humidity(45).percent(), Some(45));
        assert!(Humidity(ITPLUS_NO_HUMIDITY).is_secondary_channel());
        assert_eq!(Humidity(ITPLUS_NO_HUMIDITY).percent(), None);
    }
}
