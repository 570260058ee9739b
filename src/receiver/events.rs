//! Observability hook for the frame pipeline

use tracing::{debug, info};

use crate::error::ItPlusError;
use crate::itplus::protocol::{DecodedReading, SensorId};

/// Why a frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// CRC register did not end at zero
    Crc { residue: u8 },

    /// Length nibble was not the IT+ one
    Length { declared: u8 },

    /// Field values outside the protocol's range
    Malformed,
}

impl From<&ItPlusError> for RejectReason {
    fn from(err: &ItPlusError) -> Self {
        match *err {
            ItPlusError::InvalidFrame { residue } => RejectReason::Crc { residue },
            ItPlusError::UnexpectedLength { declared } => RejectReason::Length { declared },
            _ => RejectReason::Malformed,
        }
    }
}

/// Points of interest in the frame pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverEvent {
    FrameAccepted { reading: DecodedReading },
    FrameRejected { reason: RejectReason },
    ChannelMatched { channel: usize, sensor_id: SensorId },
    DiscoveryInserted { slot: usize, sensor_id: SensorId },
    DiscoveryRefreshed { slot: usize, sensor_id: SensorId },
    DiscoveryEvicted { slot: usize, evicted: SensorId, replacement: SensorId },
}

/// Receives every [`ReceiverEvent`] emitted by the pipeline
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    fn on_event(&mut self, event: &ReceiverEvent);
}

/// Default sink: structured `tracing` output
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&mut self, event: &ReceiverEvent) {
        match *event {
            ReceiverEvent::FrameAccepted { reading } => debug!(
                sensor = %reading.identity(),
                temperature = %reading.temperature,
                humidity = reading.humidity.0,
                low_battery = reading.low_battery,
                "IT+ frame accepted"
            ),
            ReceiverEvent::FrameRejected { reason } => {
                debug!(?reason, "IT+ frame rejected")
            }
            ReceiverEvent::ChannelMatched { channel, sensor_id } => {
                debug!(channel, sensor = %sensor_id, "Registered sensor matched")
            }
            ReceiverEvent::DiscoveryInserted { slot, sensor_id } => {
                info!(slot, sensor = %sensor_id, "Discovered new sensor")
            }
            ReceiverEvent::DiscoveryRefreshed { slot, sensor_id } => {
                debug!(slot, sensor = %sensor_id, "Discovered sensor heard again")
            }
            ReceiverEvent::DiscoveryEvicted {
                slot,
                evicted,
                replacement,
            } => info!(
                slot,
                evicted = %evicted,
                replacement = %replacement,
                "Discovery table full, evicted stalest sensor"
            ),
        }
    }
}
