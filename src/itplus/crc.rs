//! # IT+ CRC-8 Implementation
//!
//! CRC-8 used by La Crosse IT+ sensors.
//!
//! **Polynomial**: 0x31 (x^8 + x^5 + x^4 + 1)
//! **Initial Value**: 0x00
//!
//! The receiver shifts every frame bit (CRC byte included) through the
//! register, MSB first. A frame is valid when the register ends at zero.

/// IT+ CRC-8 polynomial
const CRC8_POLY: u8 = 0x31;

/// Precomputed CRC8 lookup table for computing check bytes
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Shift every bit of `data` through the CRC register and return it
///
/// The top bit of the register is tested before the shift; if it was set,
/// the polynomial is XORed in after the incoming bit is appended.
///
/// # Arguments
///
/// * `data` - Complete frame bytes, check byte included
///
/// # Returns
///
/// * `u8` - Final register value (0 for a valid frame)
pub fn residue(data: &[u8]) -> u8 {
    let mut reg: u8 = 0;

    for &byte in data {
        for shift in (0..8).rev() {
            let bit = (byte >> shift) & 1;
            let do_xor = reg & 0x80 != 0;

            reg = (reg << 1) | bit;

            if do_xor {
                reg ^= CRC8_POLY;
            }
        }
    }

    reg
}

/// Check whether a complete frame carries a valid IT+ CRC
///
/// # Examples
///
/// ```
/// use itplus_rx::itplus::crc::validate;
///
/// assert!(validate(&[0x9F, 0x23, 0x18, 0x45, 0x65]));
/// assert!(!validate(&[0x9F, 0x23, 0x18, 0x45, 0x00]));
/// ```
pub fn validate(frame: &[u8]) -> bool {
    residue(frame) == 0
}

/// Calculate the check byte a sensor appends to `payload`
///
/// # Examples
///
/// ```
/// use itplus_rx::itplus::crc::crc8_itplus;
///
/// assert_eq!(crc8_itplus(&[0x9F, 0x23, 0x18, 0x45]), 0x65);
/// ```
pub fn crc8_itplus(payload: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in payload {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    crc
}
