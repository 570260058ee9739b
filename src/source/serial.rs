//! # Radio Bridge Serial Port
//!
//! Opens the serial port of a radio bridge that prints received IT+ frames
//! as hex lines.

use std::time::Duration;

use tokio::io::BufReader;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::HexLineSource;
use crate::error::{ItPlusError, Result};

/// Frame source backed by a serial port
pub type SerialFrameSource = HexLineSource<BufReader<tokio_serial::SerialStream>>;

/// Device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (JeeLink, FTDI)
    "/dev/ttyACM0", // USB CDC boards
];

/// Open a radio bridge on the configured port
///
/// An empty `path` tries [`DEFAULT_DEVICE_PATHS`].
///
/// # Errors
///
/// Returns [`ItPlusError::Serial`] if no port could be opened.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use itplus_rx::source::serial::open;
///
/// let source = open("/dev/ttyUSB0", 57600, Duration::from_millis(100))?;
/// # Ok::<(), itplus_rx::error::ItPlusError>(())
/// ```
pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<SerialFrameSource> {
    if path.is_empty() {
        open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate, timeout)
    } else {
        open_with_paths(&[path], baud_rate, timeout)
    }
}

/// Try each device path in turn and open the first that works
pub fn open_with_paths(
    paths: &[&str],
    baud_rate: u32,
    timeout: Duration,
) -> Result<SerialFrameSource> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate, timeout) {
            Ok(port) => {
                info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
                return Ok(HexLineSource::new(BufReader::new(port)));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(ItPlusError::Serial(format!(
        "no radio bridge found (tried: {})",
        paths.join(", ")
    )))
}

/// Open a serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<tokio_serial::SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(timeout)
        .open_native_async()
        .map_err(|e| ItPlusError::Serial(format!("Failed to open {}: {}", path, e)))
}
