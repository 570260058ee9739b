//! # Sensor Registry Module
//!
//! Tracks which sensors are heard and where their readings go.
//!
//! This module handles:
//! - Registered channels (fixed slots keyed by sensor identity)
//! - Discovery of unregistered sensors with least-recently-seen eviction
//! - Ageing of both tables on explicit ticks

pub mod channels;
pub mod discovery;

use serde::Serialize;

use crate::itplus::protocol::{DecodedReading, Humidity, Temperature};

/// Last measurement received from a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub temperature: Temperature,
    pub humidity: Humidity,
    pub low_battery: bool,
}

impl From<&DecodedReading> for Measurement {
    fn from(reading: &DecodedReading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            low_battery: reading.low_battery,
        }
    }
}

/// Serializable view of a measurement
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeasurementView {
    pub temperature: f32,
    pub humidity: Option<u8>,
    pub low_battery: bool,
}

impl From<Measurement> for MeasurementView {
    fn from(m: Measurement) -> Self {
        Self {
            temperature: m.temperature.as_celsius(),
            humidity: m.humidity.percent(),
            low_battery: m.low_battery,
        }
    }
}
