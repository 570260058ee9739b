//! # IT+ Receiver
//!
//! Decode La Crosse IT+ sensor frames delivered by a radio bridge and keep
//! per-channel temperature and humidity readings.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::BufReader;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use itplus_rx::config::{Config, SourceKind};
use itplus_rx::receiver::Receiver;
use itplus_rx::snapshot::{Snapshot, SnapshotWriter};
use itplus_rx::source::{serial, FrameSource, HexLineSource};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the IT+ receiver
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber (non-blocking stderr)
///    - Load configuration (first argument, or `config/default.toml`)
///    - Build the receiver with the registered channels
///    - Open the frame source (serial radio bridge or stdin)
///
/// 2. **Main Loop**
///    - Feed every received frame through the receiver
///    - Age channels and discovered sensors on every tick
///    - Write a JSON Lines snapshot on every tick
///    - Handle Ctrl+C or end of input for shutdown
///
/// 3. **Shutdown**
///    - Write a final snapshot
///    - Log frame counters
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded
/// - The frame source cannot be opened or fails
/// - A snapshot cannot be written
///
/// # Examples
///
/// Replay a capture:
/// ```bash
/// cargo run --release -- config/replay.toml < capture.txt
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_writer)
        .init();

    info!("IT+ receiver v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let mut receiver = Receiver::new(&config.receiver_settings())?;
    info!(
        "{} of {} channels registered, {} discovery slots",
        receiver.channel_readings().count(),
        receiver.channel_count(),
        config.tables.max_discover
    );

    let mut source: Box<dyn FrameSource> = match config.source.kind {
        SourceKind::Serial => Box::new(serial::open(
            &config.source.port,
            config.source.baud_rate,
            Duration::from_millis(config.source.timeout_ms),
        )?),
        SourceKind::Stdin => {
            info!("Reading frames from stdin");
            Box::new(HexLineSource::new(BufReader::new(tokio::io::stdin())))
        }
    };

    let mut snapshots = if !config.snapshot.enabled {
        None
    } else if config.snapshot.path.is_empty() {
        Some(SnapshotWriter::stdout())
    } else {
        Some(SnapshotWriter::append(&config.snapshot.path)?)
    };

    let mut ticker = interval(Duration::from_millis(config.timing.tick_interval_ms));
    // The first tick completes immediately
    ticker.tick().await;

    info!("Listening for IT+ frames (tick every {} ms)", config.timing.tick_interval_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            frame = source.next_frame() => match frame {
                Ok(Some(raw)) => {
                    if let Err(e) = receiver.on_frame_received(&raw) {
                        debug!("Dropped frame {:02X?}: {}", raw, e);
                    }
                }
                Ok(None) => {
                    info!("Frame source closed");
                    break;
                }
                Err(e) if e.is_frame_rejection() => warn!("{}", e),
                Err(e) => return Err(e.into()),
            },

            _ = ticker.tick() => {
                receiver.tick();
                if let Some(writer) = snapshots.as_mut() {
                    writer.write(&Snapshot::capture(&receiver, Utc::now()))?;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(writer) = snapshots.as_mut() {
        writer.write(&Snapshot::capture(&receiver, Utc::now()))?;
    }

    let stats = receiver.stats();
    info!(
        "Frames accepted: {}, rejected: {} CRC / {} length / {} malformed",
        stats.accepted, stats.rejected_crc, stats.rejected_length, stats.rejected_malformed
    );
    info!(
        "Channel hits: {}, discovered: {} new / {} evicted",
        stats.channel_hits, stats.discovery_inserts, stats.discovery_evictions
    );

    Ok(())
}
