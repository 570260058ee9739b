//! # IT+ Protocol Module
//!
//! Implementation of the La Crosse IT+ sensor protocol.
//!
//! This module handles:
//! - CRC-8 (poly 0x31) frame validation
//! - Frame decoding (identity, reset flag, temperature, humidity)
//! - Temperature offset and sign correction
//! - Frame encoding for simulated sensors

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
