//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{ItPlusError, Result};
use crate::itplus::protocol::ITPLUS_ID_MASK;
use crate::receiver::ReceiverSettings;

/// Largest table the registry accepts (one slot per possible identity)
const MAX_TABLE_SIZE: usize = 64;

/// Baud rates supported by the radio bridges
const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

/// Where frames come from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Hex lines from a radio bridge on a serial port
    Serial,
    /// Hex lines on standard input (replay)
    Stdin,
}

/// Frame source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,

    /// Serial device; empty tries the usual USB serial devices
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Table capacities
#[derive(Debug, Deserialize, Clone)]
pub struct TablesConfig {
    #[serde(default = "default_max_sensors")]
    pub max_sensors: usize,

    #[serde(default = "default_max_discover")]
    pub max_discover: usize,
}

/// Ageing constants
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_rx_timeout_ticks")]
    pub rx_timeout_ticks: u8,

    #[serde(default = "default_discovery_period")]
    pub discovery_period: u8,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Registered sensors
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegistryConfig {
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelAssignment>,
}

/// One `[[registry.channel]]` entry
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAssignment {
    pub slot: usize,
    pub sensor_id: u8,
}

/// Snapshot output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_enabled")]
    pub enabled: bool,

    /// JSONL file to append to; empty writes to stdout
    #[serde(default)]
    pub path: String,
}

// Default value functions
fn default_source_kind() -> SourceKind { SourceKind::Serial }
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 57600 }
fn default_timeout_ms() -> u64 { 100 }

fn default_max_sensors() -> usize { crate::receiver::DEFAULT_MAX_SENSORS }
fn default_max_discover() -> usize { crate::receiver::DEFAULT_MAX_DISCOVER }

fn default_rx_timeout_ticks() -> u8 { crate::receiver::DEFAULT_RX_TIMEOUT_TICKS }
fn default_discovery_period() -> u8 { crate::receiver::DEFAULT_DISCOVERY_PERIOD }
fn default_tick_interval_ms() -> u64 { 60_000 }

fn default_snapshot_enabled() -> bool { true }

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            max_sensors: default_max_sensors(),
            max_discover: default_max_discover(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rx_timeout_ticks: default_rx_timeout_ticks(),
            discovery_period: default_discovery_period(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_snapshot_enabled(),
            path: String::new(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> ItPlusError {
    ItPlusError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use itplus_rx::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings the receiver is built from
    pub fn receiver_settings(&self) -> ReceiverSettings {
        ReceiverSettings {
            max_sensors: self.tables.max_sensors,
            max_discover: self.tables.max_discover,
            rx_timeout_ticks: self.timing.rx_timeout_ticks,
            discovery_period: self.timing.discovery_period,
            assignments: self
                .registry
                .channels
                .iter()
                .map(|a| (a.slot, a.sensor_id))
                .collect(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if !SUPPORTED_BAUD_RATES.contains(&self.source.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if self.source.timeout_ms == 0 || self.source.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        for (name, value) in [
            ("max_sensors", self.tables.max_sensors),
            ("max_discover", self.tables.max_discover),
        ] {
            if value == 0 || value > MAX_TABLE_SIZE {
                return Err(invalid(format!(
                    "{} must be between 1 and {}",
                    name, MAX_TABLE_SIZE
                )));
            }
        }

        if self.timing.rx_timeout_ticks == 0 {
            return Err(invalid("rx_timeout_ticks must be greater than 0"));
        }

        if self.timing.discovery_period == 0 {
            return Err(invalid("discovery_period must be greater than 0"));
        }

        if self.timing.tick_interval_ms == 0 || self.timing.tick_interval_ms > 3_600_000 {
            return Err(invalid("tick_interval_ms must be between 1 and 3600000"));
        }

        let mut slots = HashSet::new();
        let mut ids = HashSet::new();
        for assignment in &self.registry.channels {
            if assignment.slot >= self.tables.max_sensors {
                return Err(invalid(format!(
                    "registry slot {} is out of bounds (must be 0-{})",
                    assignment.slot,
                    self.tables.max_sensors - 1
                )));
            }

            if assignment.sensor_id > ITPLUS_ID_MASK {
                return Err(invalid(format!(
                    "sensor_id {} is out of range (must be 0-63)",
                    assignment.sensor_id
                )));
            }

            if !slots.insert(assignment.slot) {
                return Err(invalid(format!(
                    "registry slot {} assigned twice",
                    assignment.slot
                )));
            }

            if !ids.insert(assignment.sensor_id) {
                return Err(invalid(format!(
                    "sensor_id {} registered twice",
                    assignment.sensor_id
                )));
            }
        }

        Ok(())
    }
}
