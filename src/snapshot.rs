//! # Snapshot Module
//!
//! Periodic JSON Lines dump of the receiver state for the host application.
//!
//! Each line holds a UTC timestamp, every registered channel, every
//! discovered sensor and the frame counters.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::receiver::events::EventSink;
use crate::receiver::{FrameStats, Receiver};
use crate::registry::MeasurementView;

/// Registered channel as written to the snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelSnapshot {
    pub channel: usize,
    pub sensor_id: u8,
    pub stale: bool,
    pub reading: Option<MeasurementView>,
}

/// Discovered sensor as written to the snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscoveredSnapshot {
    pub slot: usize,
    pub sensor_id: u8,
    pub reset: bool,
    pub recency: u8,
    pub reading: MeasurementView,
}

/// Receiver state at one point in time
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<ChannelSnapshot>,
    pub discovered: Vec<DiscoveredSnapshot>,
    pub stats: FrameStats,
}

impl Snapshot {
    /// Capture the state of a receiver
    pub fn capture<S: EventSink>(receiver: &Receiver<S>, timestamp: DateTime<Utc>) -> Self {
        let channels = receiver
            .channel_readings()
            .map(|r| ChannelSnapshot {
                channel: r.channel,
                sensor_id: r.sensor_id.masked(),
                stale: r.is_stale,
                reading: r.measurement.map(MeasurementView::from),
            })
            .collect();

        let discovered = receiver
            .discovered_entries()
            .map(|(slot, entry)| DiscoveredSnapshot {
                slot,
                sensor_id: entry.sensor_id.masked(),
                reset: entry.sensor_id.has_reset_flag(),
                recency: entry.recency,
                reading: MeasurementView::from(entry.measurement),
            })
            .collect();

        Self {
            timestamp,
            channels,
            discovered,
            stats: receiver.stats(),
        }
    }
}

/// Writes snapshots as JSON Lines
pub struct SnapshotWriter {
    out: Box<dyn Write + Send>,
}

impl std::fmt::Debug for SnapshotWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotWriter").finish_non_exhaustive()
    }
}

impl SnapshotWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    /// Write to standard output
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Append to a file, creating it if needed
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Write one snapshot line and flush
    pub fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itplus::protocol::SensorId;
    use crate::receiver::ReceiverSettings;
    use chrono::TimeZone;

    fn receiver() -> Receiver {
        let settings = ReceiverSettings {
            assignments: vec![(0, 0x3C), (2, 0x05)],
            ..ReceiverSettings::default()
        };
        let mut receiver = Receiver::new(&settings).unwrap();
        // 0x3C with reset flag: -8.2, 69 %
        receiver
            .on_frame_received(&[0x9F, 0x23, 0x18, 0x45, 0x65])
            .unwrap();
        receiver.unregister(2);
        receiver
            .register(2, SensorId::new(0x06, false))
            .unwrap();
        // 0x05, 21.3, 45 %: unregistered now
        receiver
            .on_frame_received(&[0x91, 0x46, 0x13, 0x2D, 0x8C])
            .unwrap();
        receiver
    }

    #[test]
    fn test_capture() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let snapshot = Snapshot::capture(&receiver(), ts);

        assert_eq!(snapshot.channels.len(), 2);
        let first = &snapshot.channels[0];
        assert_eq!(first.sensor_id, 0x3C);
        assert!(!first.stale);
        let reading = first.reading.as_ref().unwrap();
        assert!((reading.temperature + 8.2).abs() < 0.001);
        assert_eq!(reading.humidity, Some(69));

        assert!(snapshot.channels[1].stale);
        assert!(snapshot.channels[1].reading.is_none());

        assert_eq!(snapshot.discovered.len(), 1);
        assert_eq!(snapshot.discovered[0].sensor_id, 0x05);
        assert_eq!(snapshot.discovered[0].recency, 255);
        assert_eq!(snapshot.stats.accepted, 2);
    }

    #[test]
    fn test_write_json_line() {
        use std::io::Read;

        let file = tempfile::NamedTempFile::new().unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        {
            let mut writer = SnapshotWriter::append(file.path()).unwrap();
            writer.write(&Snapshot::capture(&receiver(), ts)).unwrap();
            writer.write(&Snapshot::capture(&receiver(), ts)).unwrap();
        }

        let mut contents = String::new();
        std::fs::File::open(file.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["timestamp"], "2026-01-02T03:04:05Z");
        assert_eq!(value["channels"][0]["sensor_id"], 60);
        assert_eq!(value["discovered"][0]["reset"], false);
        assert_eq!(value["stats"]["channel_hits"], 1);
    }
}
