//! # Sensor Discovery
//!
//! Bounded list of sensors heard on the air but not registered on a
//! channel. Each receipt raises an entry's recency score to the ceiling;
//! [`DiscoveryTable::tick`] lowers it. When the table is full the entry with
//! the lowest score is replaced.

use super::Measurement;
use crate::itplus::protocol::SensorId;

/// A sensor seen but not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredEntry {
    /// Identity as first heard, reset bit included
    pub sensor_id: SensorId,

    /// Last measurement received
    pub measurement: Measurement,

    /// Set to the ceiling on receipt, lowered by ticks
    pub recency: u8,
}

/// Result of [`DiscoveryTable::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Sensor was already known; measurement and score refreshed
    Refreshed { slot: usize },

    /// Sensor stored in a free slot
    Inserted { slot: usize },

    /// Sensor replaced the stalest entry
    Evicted { slot: usize, evicted: DiscoveredEntry },
}

impl UpsertOutcome {
    pub fn slot(&self) -> usize {
        match *self {
            UpsertOutcome::Refreshed { slot }
            | UpsertOutcome::Inserted { slot }
            | UpsertOutcome::Evicted { slot, .. } => slot,
        }
    }
}

/// Table of discovered sensors
#[derive(Debug, Clone)]
pub struct DiscoveryTable {
    slots: Box<[Option<DiscoveredEntry>]>,
    ceiling: u8,
}

impl DiscoveryTable {
    /// Create an empty table
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of slots (at least one slot is always allocated)
    /// * `ceiling` - Recency score given on every receipt
    pub fn new(capacity: usize, ceiling: u8) -> Self {
        Self {
            slots: vec![None; capacity.max(1)].into_boxed_slice(),
            ceiling,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a slot holds an entry
    pub fn is_occupied(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    pub fn get(&self, slot: usize) -> Option<&DiscoveredEntry> {
        self.slots.get(slot)?.as_ref()
    }

    /// Find a sensor, ignoring the reset flag
    pub fn find(&self, sensor_id: SensorId) -> Option<(usize, &DiscoveredEntry)> {
        self.iter().find(|(_, entry)| entry.sensor_id.matches(sensor_id))
    }

    /// Occupied slots with their index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DiscoveredEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot, e)))
    }

    /// Record a receipt from an unregistered sensor
    ///
    /// 1. Known sensor: refresh score and measurement, keep the stored identity.
    /// 2. Free slot: store the sensor.
    /// 3. Full: replace the lowest score, lowest index on ties.
    pub fn upsert(&mut self, sensor_id: SensorId, measurement: Measurement) -> UpsertOutcome {
        let ceiling = self.ceiling;

        if let Some(slot) = self.position(sensor_id) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.measurement = measurement;
                entry.recency = ceiling;
            }
            return UpsertOutcome::Refreshed { slot };
        }

        let fresh = DiscoveredEntry {
            sensor_id,
            measurement,
            recency: ceiling,
        };

        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(fresh);
            return UpsertOutcome::Inserted { slot };
        }

        // min_by_key keeps the first of equal minimums
        let (slot, _) = self
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.map_or(0, |e| e.recency))
            .unwrap_or((0, &None));

        match self.slots[slot].replace(fresh) {
            Some(evicted) => UpsertOutcome::Evicted { slot, evicted },
            None => UpsertOutcome::Inserted { slot },
        }
    }

    /// Remove a sensor, ignoring the reset flag
    pub fn remove(&mut self, sensor_id: SensorId) -> Option<DiscoveredEntry> {
        let slot = self.position(sensor_id)?;
        self.slots[slot].take()
    }

    /// Lower every score by one, saturating at zero
    pub fn tick(&mut self) {
        for entry in self.slots.iter_mut().flatten() {
            entry.recency = entry.recency.saturating_sub(1);
        }
    }

    fn position(&self, sensor_id: SensorId) -> Option<usize> {
        self.find(sensor_id).map(|(slot, _)| slot)
    }
}
