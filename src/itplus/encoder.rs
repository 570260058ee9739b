//! # IT+ Frame Encoder
//!
//! Packs readings into IT+ frames the way a sensor transmits them. Used to
//! simulate sensors and to build test traffic.

use super::crc::crc8_itplus;
use super::protocol::*;
use crate::error::{ItPlusError, Result};

/// Highest offset temperature the tens nibble and units digit can carry
const MAX_RAW_TEMPERATURE: u8 = 15 * 10 + 9;

/// Encode a reading into a complete IT+ frame (CRC included)
///
/// # Arguments
///
/// * `reading` - Reading to transmit
///
/// # Returns
///
/// * `Result<RawFrame>` - 5-byte frame
///
/// # Errors
///
/// Returns [`ItPlusError::MalformedFrame`] if the temperature cannot be
/// represented in the frame.
///
/// # Examples
///
/// ```
/// use itplus_rx::itplus::encoder::encode_frame;
/// use itplus_rx::itplus::protocol::{DecodedReading, Humidity, Temperature};
///
/// let reading = DecodedReading {
///     sensor_id: 0x3C,
///     reset: true,
///     temperature: Temperature::new(true, 8, 2),
///     humidity: Humidity(69),
///     low_battery: false,
/// };
/// assert_eq!(encode_frame(&reading)?, [0x9F, 0x23, 0x18, 0x45, 0x65]);
/// # Ok::<(), itplus_rx::error::ItPlusError>(())
/// ```
pub fn encode_frame(reading: &DecodedReading) -> Result<RawFrame> {
    let (raw_temp, raw_tenths) = offset_temperature(reading.temperature)?;

    let id = reading.sensor_id & ITPLUS_ID_MASK;
    let reset = if reading.reset { 0b0010_0000 } else { 0 };
    let battery = if reading.low_battery { 0x80 } else { 0 };

    let payload = [
        (ITPLUS_LENGTH_NIBBLE << 4) | (id >> 2),
        ((id & 0x03) << 6) | reset | (raw_temp / 10),
        ((raw_temp % 10) << 4) | raw_tenths,
        battery | (reading.humidity.0 & 0x7F),
    ];

    Ok([
        payload[0],
        payload[1],
        payload[2],
        payload[3],
        crc8_itplus(&payload),
    ])
}

/// Inverse of the receiver's sign correction
fn offset_temperature(temperature: Temperature) -> Result<(u8, u8)> {
    if temperature.tenths > 9 {
        return Err(ItPlusError::MalformedFrame(format!(
            "tenths digit out of range: {}",
            temperature.tenths
        )));
    }

    let magnitude = temperature.magnitude();
    let encoded = if !temperature.is_negative() {
        magnitude
            .checked_add(ITPLUS_TEMP_OFFSET)
            .filter(|raw| *raw <= MAX_RAW_TEMPERATURE)
            .map(|raw| (raw, temperature.tenths))
    } else if temperature.tenths == 0 {
        ITPLUS_TEMP_OFFSET.checked_sub(magnitude).map(|raw| (raw, 0))
    } else {
        (ITPLUS_TEMP_OFFSET - 1)
            .checked_sub(magnitude)
            .map(|raw| (raw, 10 - temperature.tenths))
    };

    encoded.ok_or_else(|| {
        ItPlusError::MalformedFrame(format!("temperature {} out of range", temperature))
    })
}
