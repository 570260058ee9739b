//! # Frame Receiver
//!
//! Runs each received frame through CRC check, decoding and the sensor
//! registry, and exposes the resulting per-channel readings.
//!
//! Processing is synchronous and runs to completion for every frame; the
//! caller serializes frames and ticks.

pub mod events;

use serde::Serialize;

use crate::error::{ItPlusError, Result};
use crate::itplus::crc::residue;
use crate::itplus::decoder::decode_frame;
use crate::itplus::protocol::{DecodedReading, RawFrame, SensorId, ITPLUS_ID_MASK};
use crate::registry::channels::{ChannelReading, ChannelTable};
use crate::registry::discovery::{DiscoveredEntry, DiscoveryTable, UpsertOutcome};
use crate::registry::Measurement;
use events::{EventSink, ReceiverEvent, RejectReason, TracingSink};

/// Default number of registered channels
pub const DEFAULT_MAX_SENSORS: usize = 15;

/// Default number of discovery slots
pub const DEFAULT_MAX_DISCOVER: usize = DEFAULT_MAX_SENSORS;

/// Default ticks a channel stays fresh after a reception
pub const DEFAULT_RX_TIMEOUT_TICKS: u8 = 5;

/// Default recency score given to a discovered sensor on receipt
pub const DEFAULT_DISCOVERY_PERIOD: u8 = 255;

/// Start-up parameters of a [`Receiver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSettings {
    pub max_sensors: usize,
    pub max_discover: usize,
    pub rx_timeout_ticks: u8,
    pub discovery_period: u8,

    /// Initial `(channel, sensor identity)` assignments
    pub assignments: Vec<(usize, u8)>,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            max_sensors: DEFAULT_MAX_SENSORS,
            max_discover: DEFAULT_MAX_DISCOVER,
            rx_timeout_ticks: DEFAULT_RX_TIMEOUT_TICKS,
            discovery_period: DEFAULT_DISCOVERY_PERIOD,
            assignments: Vec::new(),
        }
    }
}

/// What happened to an accepted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame came from a registered sensor
    Channel { channel: usize, reading: DecodedReading },

    /// Frame came from an unregistered sensor
    Discovered { reading: DecodedReading, upsert: UpsertOutcome },
}

/// Frame counters since start-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub accepted: u64,
    pub rejected_crc: u64,
    pub rejected_length: u64,
    pub rejected_malformed: u64,
    pub channel_hits: u64,
    pub discovery_inserts: u64,
    pub discovery_refreshes: u64,
    pub discovery_evictions: u64,
}

/// IT+ frame receiver and sensor registry
#[derive(Debug)]
pub struct Receiver<S: EventSink = TracingSink> {
    channels: ChannelTable,
    discovery: DiscoveryTable,
    sink: S,
    stats: FrameStats,
}

impl Receiver<TracingSink> {
    /// Create a receiver that reports events through `tracing`
    ///
    /// # Errors
    ///
    /// Returns [`ItPlusError::Registration`] if an initial assignment is
    /// invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use itplus_rx::receiver::{Receiver, ReceiverSettings};
    ///
    /// let settings = ReceiverSettings {
    ///     assignments: vec![(0, 0x3C)],
    ///     ..ReceiverSettings::default()
    /// };
    /// let mut receiver = Receiver::new(&settings)?;
    /// receiver.on_frame_received(&[0x9F, 0x23, 0x18, 0x45, 0x65])?;
    ///
    /// let reading = receiver.channel_reading(0).unwrap();
    /// assert!(!reading.is_stale);
    /// # Ok::<(), itplus_rx::error::ItPlusError>(())
    /// ```
    pub fn new(settings: &ReceiverSettings) -> Result<Self> {
        Self::with_sink(settings, TracingSink)
    }
}

impl<S: EventSink> Receiver<S> {
    /// Create a receiver reporting to a custom event sink
    pub fn with_sink(settings: &ReceiverSettings, sink: S) -> Result<Self> {
        let mut channels = ChannelTable::new(settings.max_sensors, settings.rx_timeout_ticks);
        for &(channel, id) in &settings.assignments {
            if id > ITPLUS_ID_MASK {
                return Err(ItPlusError::Registration(format!(
                    "sensor id {} does not fit in 6 bits",
                    id
                )));
            }
            channels.assign(channel, SensorId::new(id, false))?;
        }

        Ok(Self {
            channels,
            discovery: DiscoveryTable::new(settings.max_discover, settings.discovery_period),
            sink,
            stats: FrameStats::default(),
        })
    }

    /// Process one frame from the radio
    ///
    /// # Arguments
    ///
    /// * `raw` - Frame as received, CRC byte included
    ///
    /// # Returns
    ///
    /// * `Result<FrameOutcome>` - Where the reading went
    ///
    /// # Errors
    ///
    /// Returns a frame rejection ([`ItPlusError::InvalidFrame`],
    /// [`ItPlusError::UnexpectedLength`] or [`ItPlusError::MalformedFrame`]).
    /// Rejected frames leave both tables untouched.
    pub fn on_frame_received(&mut self, raw: &RawFrame) -> Result<FrameOutcome> {
        let reading = match self.check_and_decode(raw) {
            Ok(reading) => reading,
            Err(err) => {
                self.reject(&err);
                return Err(err);
            }
        };

        self.stats.accepted += 1;
        self.sink.on_event(&ReceiverEvent::FrameAccepted { reading });

        let sensor_id = reading.identity();
        let measurement = Measurement::from(&reading);

        if let Some(channel) = self.channels.lookup(sensor_id) {
            self.channels.update(channel, measurement);
            self.stats.channel_hits += 1;
            self.sink
                .on_event(&ReceiverEvent::ChannelMatched { channel, sensor_id });
            return Ok(FrameOutcome::Channel { channel, reading });
        }

        let upsert = self.discovery.upsert(sensor_id, measurement);
        let event = match upsert {
            UpsertOutcome::Refreshed { slot } => {
                self.stats.discovery_refreshes += 1;
                ReceiverEvent::DiscoveryRefreshed { slot, sensor_id }
            }
            UpsertOutcome::Inserted { slot } => {
                self.stats.discovery_inserts += 1;
                ReceiverEvent::DiscoveryInserted { slot, sensor_id }
            }
            UpsertOutcome::Evicted { slot, evicted } => {
                self.stats.discovery_evictions += 1;
                ReceiverEvent::DiscoveryEvicted {
                    slot,
                    evicted: evicted.sensor_id,
                    replacement: sensor_id,
                }
            }
        };
        self.sink.on_event(&event);

        Ok(FrameOutcome::Discovered { reading, upsert })
    }

    /// Advance both tables by one time step
    pub fn tick(&mut self) {
        self.channels.tick();
        self.discovery.tick();
    }

    /// Register a sensor on a channel
    ///
    /// The sensor leaves the discovery table; any sensor previously on the
    /// channel is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ItPlusError::Registration`] if the channel does not exist or
    /// the sensor is already registered on another channel.
    pub fn register(&mut self, channel: usize, sensor_id: SensorId) -> Result<()> {
        self.channels.assign(channel, sensor_id)?;
        self.discovery.remove(sensor_id);
        Ok(())
    }

    /// Remove the sensor registered on a channel
    pub fn unregister(&mut self, channel: usize) -> Option<SensorId> {
        self.channels.clear(channel)
    }

    /// Number of channel slots
    pub fn channel_count(&self) -> usize {
        self.channels.capacity()
    }

    /// Current state of a registered channel
    pub fn channel_reading(&self, channel: usize) -> Option<ChannelReading> {
        self.channels.reading(channel)
    }

    pub fn channel_readings(&self) -> impl Iterator<Item = ChannelReading> + '_ {
        self.channels.readings()
    }

    /// Number of discovered, unregistered sensors
    pub fn discovered_count(&self) -> usize {
        self.discovery.len()
    }

    pub fn discovered_entries(&self) -> impl Iterator<Item = (usize, &DiscoveredEntry)> {
        self.discovery.iter()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn check_and_decode(&self, raw: &RawFrame) -> Result<DecodedReading> {
        match residue(raw) {
            0 => decode_frame(raw),
            value => Err(ItPlusError::InvalidFrame { residue: value }),
        }
    }

    fn reject(&mut self, err: &ItPlusError) {
        let reason = RejectReason::from(err);
        match reason {
            RejectReason::Crc { .. } => self.stats.rejected_crc += 1,
            RejectReason::Length { .. } => self.stats.rejected_length += 1,
            RejectReason::Malformed => self.stats.rejected_malformed += 1,
        }
        self.sink.on_event(&ReceiverEvent::FrameRejected { reason });
    }
}
