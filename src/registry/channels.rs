//! # Registered Channels
//!
//! Fixed table of registered sensors. The slot index is the channel number
//! the host application sees.

use super::Measurement;
use crate::error::{ItPlusError, Result};
use crate::itplus::protocol::SensorId;

/// One channel slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSlot {
    /// Registered identity (reset bit cleared), `None` for an empty slot
    sensor_id: Option<SensorId>,

    /// Last measurement, `None` until the first frame arrives
    measurement: Option<Measurement>,

    /// Counts down from the RX timeout; 0 means stale
    ticks_since_receipt: u8,
}

impl ChannelSlot {
    /// Whether a sensor is assigned to this slot
    pub fn is_occupied(&self) -> bool {
        self.sensor_id.is_some()
    }

    pub fn sensor_id(&self) -> Option<SensorId> {
        self.sensor_id
    }

    pub fn measurement(&self) -> Option<Measurement> {
        self.measurement
    }

    pub fn ticks_since_receipt(&self) -> u8 {
        self.ticks_since_receipt
    }
}

/// Read-only view of a registered channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelReading {
    pub channel: usize,
    pub sensor_id: SensorId,
    pub measurement: Option<Measurement>,
    pub is_stale: bool,
}

/// Table of registered channels
#[derive(Debug, Clone)]
pub struct ChannelTable {
    slots: Box<[ChannelSlot]>,
    rx_timeout: u8,
}

impl ChannelTable {
    /// Create a table of `capacity` empty slots
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of channels
    /// * `rx_timeout` - Ticks a channel stays fresh after a reception
    pub fn new(capacity: usize, rx_timeout: u8) -> Self {
        Self {
            slots: vec![ChannelSlot::default(); capacity].into_boxed_slice(),
            rx_timeout,
        }
    }

    /// Number of channel slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of assigned slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    pub fn slot(&self, channel: usize) -> Option<&ChannelSlot> {
        self.slots.get(channel)
    }

    /// Assign a sensor to a channel slot
    ///
    /// Any previous assignment of the slot is replaced; the new slot starts
    /// stale, with no measurement.
    ///
    /// # Errors
    ///
    /// Returns [`ItPlusError::Registration`] if the slot does not exist or the
    /// identity is already registered on another slot.
    pub fn assign(&mut self, channel: usize, sensor_id: SensorId) -> Result<()> {
        if channel >= self.slots.len() {
            return Err(ItPlusError::Registration(format!(
                "channel {} out of range (0-{})",
                channel,
                self.slots.len().saturating_sub(1)
            )));
        }

        if let Some(other) = self.find(sensor_id) {
            if other != channel {
                return Err(ItPlusError::Registration(format!(
                    "sensor {} already registered on channel {}",
                    sensor_id, other
                )));
            }
        }

        self.slots[channel] = ChannelSlot {
            sensor_id: Some(SensorId::new(sensor_id.masked(), false)),
            measurement: None,
            ticks_since_receipt: 0,
        };
        Ok(())
    }

    /// Empty a channel slot, returning the identity it held
    pub fn clear(&mut self, channel: usize) -> Option<SensorId> {
        let slot = self.slots.get_mut(channel)?;
        std::mem::take(slot).sensor_id
    }

    /// Find the channel of a sensor without touching its timer
    pub fn find(&self, sensor_id: SensorId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.sensor_id
                .map_or(false, |registered| registered.matches(sensor_id))
        })
    }

    /// Look up a received sensor and refresh its timer on a match
    ///
    /// The reset flag is ignored for matching.
    ///
    /// # Returns
    ///
    /// * `Option<usize>` - Channel number, or `None` if not registered
    pub fn lookup(&mut self, sensor_id: SensorId) -> Option<usize> {
        let channel = self.find(sensor_id)?;
        self.slots[channel].ticks_since_receipt = self.rx_timeout;
        Some(channel)
    }

    /// Store the latest measurement of a channel
    pub fn update(&mut self, channel: usize, measurement: Measurement) {
        if let Some(slot) = self.slots.get_mut(channel) {
            if slot.is_occupied() {
                slot.measurement = Some(measurement);
            }
        }
    }

    /// Age every channel by one tick
    pub fn tick(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.is_occupied()) {
            slot.ticks_since_receipt = slot.ticks_since_receipt.saturating_sub(1);
        }
    }

    /// Read the state of a registered channel
    ///
    /// Returns `None` for an empty or out-of-range slot.
    pub fn reading(&self, channel: usize) -> Option<ChannelReading> {
        let slot = self.slots.get(channel)?;
        let sensor_id = slot.sensor_id?;

        Some(ChannelReading {
            channel,
            sensor_id,
            measurement: slot.measurement,
            is_stale: slot.ticks_since_receipt == 0,
        })
    }

    /// Iterate over all registered channels
    pub fn readings(&self) -> impl Iterator<Item = ChannelReading> + '_ {
        (0..self.slots.len()).filter_map(move |channel| self.reading(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itplus::protocol::{Humidity, Temperature};

    const TIMEOUT: u8 = 5;

    fn measurement(whole: u8, tenths: u8) -> Measurement {
        Measurement {
            temperature: Temperature::new(false, whole, tenths),
            humidity: Humidity(40),
            low_battery: false,
        }
    }

    fn table_with(assignments: &[(usize, u8)]) -> ChannelTable {
        let mut table = ChannelTable::new(15, TIMEOUT);
        for &(channel, id) in assignments {
            table.assign(channel, SensorId::new(id, false)).unwrap();
        }
        table
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = ChannelTable::new(15, TIMEOUT);
        assert_eq!(table.capacity(), 15);
        assert_eq!(table.occupied(), 0);
        assert!(table.reading(0).is_none());
        assert!(table.reading(15).is_none());
    }

    #[test]
    fn test_lookup_hit_refreshes_timer() {
        let mut table = table_with(&[(3, 0x12)]);
        assert!(table.reading(3).unwrap().is_stale);

        assert_eq!(table.lookup(SensorId::new(0x12, false)), Some(3));
        assert_eq!(table.slot(3).unwrap().ticks_since_receipt(), TIMEOUT);
        assert!(!table.reading(3).unwrap().is_stale);
    }

    #[test]
    fn test_lookup_ignores_reset_flag() {
        let mut table = table_with(&[(0, 0x3C)]);
        assert_eq!(table.lookup(SensorId::new(0x3C, true)), Some(0));
    }

    #[test]
    fn test_lookup_miss() {
        let mut table = table_with(&[(0, 0x3C)]);
        assert_eq!(table.lookup(SensorId::new(0x3D, false)), None);
        assert_eq!(table.slot(0).unwrap().ticks_since_receipt(), 0);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut table = table_with(&[(7, 0x01)]);
        for _ in 0..3 {
            assert_eq!(table.lookup(SensorId::new(0x01, false)), Some(7));
            assert_eq!(table.slot(7).unwrap().ticks_since_receipt(), TIMEOUT);
            table.tick();
        }
    }

    #[test]
    fn test_tick_goes_stale() {
        let mut table = table_with(&[(0, 0x01)]);
        table.lookup(SensorId::new(0x01, false));

        for _ in 0..TIMEOUT - 1 {
            table.tick();
            assert!(!table.reading(0).unwrap().is_stale);
        }
        table.tick();
        assert!(table.reading(0).unwrap().is_stale);

        // Saturates at zero
        table.tick();
        assert_eq!(table.slot(0).unwrap().ticks_since_receipt(), 0);
    }

    #[test]
    fn test_update_stores_measurement() {
        let mut table = table_with(&[(2, 0x05)]);
        let channel = table.lookup(SensorId::new(0x05, false)).unwrap();
        table.update(channel, measurement(21, 3));

        let reading = table.reading(2).unwrap();
        assert_eq!(reading.sensor_id, SensorId::new(0x05, false));
        assert_eq!(reading.measurement, Some(measurement(21, 3)));
    }

    #[test]
    fn test_update_ignores_empty_slot() {
        let mut table = ChannelTable::new(4, TIMEOUT);
        table.update(1, measurement(10, 0));
        assert!(table.slot(1).unwrap().measurement().is_none());
    }

    #[test]
    fn test_assign_rejects_duplicate_identity() {
        let mut table = table_with(&[(0, 0x10)]);
        assert!(table.assign(1, SensorId::new(0x10, true)).is_err());
        // Re-assigning the same slot is allowed
        assert!(table.assign(0, SensorId::new(0x10, false)).is_ok());
    }

    #[test]
    fn test_assign_out_of_range() {
        let mut table = ChannelTable::new(2, TIMEOUT);
        match table.assign(2, SensorId::new(1, false)) {
            Err(ItPlusError::Registration(msg)) => assert!(msg.contains("out of range")),
            other => panic!("Expected Registration error, got: {:?}", other),
        }
    }

    #[test]
    fn test_assign_strips_reset_flag() {
        let table = {
            let mut t = ChannelTable::new(2, TIMEOUT);
            t.assign(0, SensorId::new(0x22, true)).unwrap();
            t
        };
        assert_eq!(table.reading(0).unwrap().sensor_id.raw(), 0x22);
    }

    #[test]
    fn test_clear() {
        let mut table = table_with(&[(4, 0x09)]);
        assert_eq!(table.clear(4), Some(SensorId::new(0x09, false)));
        assert_eq!(table.clear(4), None);
        assert_eq!(table.clear(99), None);
        assert_eq!(table.find(SensorId::new(0x09, false)), None);
    }

    #[test]
    fn test_readings_lists_assigned_channels() {
        let table = table_with(&[(1, 0x01), (9, 0x02)]);
        let channels: Vec<usize> = table.readings().map(|r| r.channel).collect();
        assert_eq!(channels, vec![1, 9]);
    }
}
