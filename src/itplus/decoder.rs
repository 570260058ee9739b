//! # IT+ Frame Decoder
//!
//! Decodes CRC-valid IT+ frames into sensor readings.

use super::protocol::*;
use crate::error::{ItPlusError, Result};

/// Decode a CRC-valid IT+ frame
///
/// # Arguments
///
/// * `frame` - Complete 5-byte frame (CRC already checked by the caller)
///
/// # Returns
///
/// * `Result<DecodedReading>` - Decoded reading
///
/// # Errors
///
/// Returns [`ItPlusError::UnexpectedLength`] if the length nibble of byte 0
/// is not [`ITPLUS_LENGTH_NIBBLE`], and [`ItPlusError::MalformedFrame`] if a
/// temperature digit of byte 2 is not a decimal digit.
///
/// # Examples
///
/// ```
/// use itplus_rx::itplus::decoder::decode_frame;
///
/// let reading = decode_frame(&[0x9F, 0x23, 0x18, 0x45, 0x65])?;
/// assert_eq!(reading.sensor_id, 0x3C);
/// assert_eq!(reading.temperature.to_string(), "-8.2");
/// # Ok::<(), itplus_rx::error::ItPlusError>(())
/// ```
pub fn decode_frame(frame: &RawFrame) -> Result<DecodedReading> {
    let declared = frame[0] >> 4;
    if declared != ITPLUS_LENGTH_NIBBLE {
        return Err(ItPlusError::UnexpectedLength { declared });
    }

    // Identity: low nibble of byte 0 followed by the top two bits of byte 1
    let sensor_id = ((frame[0] & 0x0F) << 2) | (frame[1] >> 6);
    let reset = frame[1] & 0b0010_0000 != 0;

    let units = frame[2] >> 4;
    let raw_tenths = frame[2] & 0x0F;
    if units > 9 || raw_tenths > 9 {
        return Err(ItPlusError::MalformedFrame(format!(
            "temperature digits out of range: 0x{:02X}",
            frame[2]
        )));
    }
    let raw_temp = (frame[1] & 0x0F) * 10 + units;

    Ok(DecodedReading {
        sensor_id,
        reset,
        temperature: correct_temperature(raw_temp, raw_tenths),
        humidity: Humidity(frame[3] & 0x7F),
        low_battery: frame[3] & 0x80 != 0,
    })
}

/// Remove the 40 degree offset and apply the sensor's sign convention
///
/// Below the offset the tenths digit counts down from the next whole degree,
/// so `raw = 31, tenths = 8` is -8.2 and `raw = 32, tenths = 0` is -8.0.
///
/// # Arguments
///
/// * `raw` - Offset temperature (tens * 10 + units)
/// * `tenths` - Tenths digit as transmitted (0-9)
pub(crate) fn correct_temperature(raw: u8, tenths: u8) -> Temperature {
    if raw >= ITPLUS_TEMP_OFFSET {
        Temperature::new(false, raw - ITPLUS_TEMP_OFFSET, tenths)
    } else if tenths == 0 {
        Temperature::new(true, ITPLUS_TEMP_OFFSET - raw, 0)
    } else {
        Temperature::new(true, ITPLUS_TEMP_OFFSET - 1 - raw, 10 - tenths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itplus::crc::{crc8_itplus, validate};
    use proptest::prelude::*;

    fn with_crc(payload: [u8; 4]) -> RawFrame {
        [
            payload[0],
            payload[1],
            payload[2],
            payload[3],
            crc8_itplus(&payload),
        ]
    }

    #[test]
    fn test_decode_reference_frame() {
        let frame = [0x9F, 0x23, 0x18, 0x45, 0x65];
        assert!(validate(&frame));

        let reading = decode_frame(&frame).unwrap();
        assert_eq!(reading.sensor_id, 0x3C);
        assert!(reading.reset);
        assert_eq!(reading.identity().raw(), 0x7C);
        assert_eq!(reading.temperature.whole, 0x88);
        assert_eq!(reading.temperature.tenths, 2);
        assert_eq!(reading.humidity, Humidity(69));
        assert!(!reading.low_battery);
    }

    #[test]
    fn test_decode_positive_temperature() {
        // id 5, 21.3 degrees, 45 %
        let frame = with_crc([0x91, 0x46, 0x13, 0x2D]);
        let reading = decode_frame(&frame).unwrap();

        assert_eq!(reading.sensor_id, 5);
        assert!(!reading.reset);
        assert_eq!(reading.temperature, Temperature::new(false, 21, 3));
        assert_eq!(reading.humidity.percent(), Some(45));
    }

    #[test]
    fn test_decode_secondary_channel_marker() {
        let frame = with_crc([0x91, 0x46, 0x13, ITPLUS_NO_HUMIDITY]);
        let reading = decode_frame(&frame).unwrap();

        assert_eq!(reading.humidity.0, ITPLUS_NO_HUMIDITY);
        assert!(reading.humidity.is_secondary_channel());
    }

    #[test]
    fn test_decode_low_battery() {
        let frame = with_crc([0x91, 0x46, 0x13, 0x80 | 0x2D]);
        let reading = decode_frame(&frame).unwrap();

        assert!(reading.low_battery);
        assert_eq!(reading.humidity.0, 0x2D);
    }

    #[test]
    fn test_decode_unexpected_length() {
        let frame = with_crc([0xAF, 0x23, 0x18, 0x45]);
        match decode_frame(&frame) {
            Err(ItPlusError::UnexpectedLength { declared }) => assert_eq!(declared, 0xA),
            other => panic!("Expected UnexpectedLength, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_non_decimal_digit() {
        let frame = with_crc([0x91, 0x46, 0x1A, 0x2D]);
        assert!(matches!(decode_frame(&frame), Err(ItPlusError::MalformedFrame(_))));

        let frame = with_crc([0x91, 0x46, 0xB3, 0x2D]);
        assert!(matches!(decode_frame(&frame), Err(ItPlusError::MalformedFrame(_))));
    }

    #[test]
    fn test_correct_temperature_edges() {
        assert_eq!(correct_temperature(40, 0), Temperature::new(false, 0, 0));
        assert_eq!(correct_temperature(40, 5), Temperature::new(false, 0, 5));
        assert_eq!(correct_temperature(39, 5), Temperature::new(true, 0, 5));
        assert_eq!(correct_temperature(39, 0), Temperature::new(true, 1, 0));
        assert_eq!(correct_temperature(32, 0), Temperature::new(true, 8, 0));
        assert_eq!(correct_temperature(31, 8), Temperature::new(true, 8, 2));
        assert_eq!(correct_temperature(0, 0), Temperature::new(true, 40, 0));
        assert_eq!(correct_temperature(0, 1), Temperature::new(true, 39, 9));
        assert_eq!(correct_temperature(79, 9), Temperature::new(false, 39, 9));
    }

    #[test]
    fn test_temperature_is_monotonic() {
        // Every step of one tenth in the raw encoding is one tenth of a degree
        let mut previous = correct_temperature(0, 0).as_tenths();
        for raw in 0u8..80 {
            for tenths in 0u8..10 {
                if raw == 0 && tenths == 0 {
                    continue;
                }
                let current = correct_temperature(raw, tenths).as_tenths();
                assert_eq!(current, previous + 1, "raw {} tenths {}", raw, tenths);
                previous = current;
            }
        }
    }

    proptest! {
        /// Property: sign correction stays in range and sets the sign below the offset
        #[test]
        fn prop_correction_ranges(raw in 0u8..80, tenths in 0u8..10) {
            let t = correct_temperature(raw, tenths);
            prop_assert!(t.magnitude() <= 59);
            prop_assert!(t.tenths <= 9);
            prop_assert_eq!(t.is_negative(), raw < ITPLUS_TEMP_OFFSET);
        }

        /// Property: every CRC-valid frame with the IT+ header and decimal digits decodes
        #[test]
        fn prop_decode_total(
            low in 0u8..16,
            byte1 in any::<u8>(),
            units in 0u8..10,
            tenths in 0u8..10,
            byte3 in any::<u8>(),
        ) {
            let frame = with_crc([0x90 | low, byte1, (units << 4) | tenths, byte3]);
            let reading = decode_frame(&frame);
            prop_assert!(reading.is_ok());

            let reading = reading.unwrap();
            prop_assert!(reading.sensor_id <= ITPLUS_ID_MASK);
            prop_assert!(reading.humidity.0 <= 0x7F);
        }
    }
}
