//! # Error Types
//!
//! Custom error types for the IT+ receiver using `thiserror`.

use thiserror::Error;

/// Main error type for the IT+ receiver
#[derive(Debug, Error)]
pub enum ItPlusError {
    /// CRC check failed, the frame is not a valid IT+ transmission
    #[error("Invalid frame: CRC residue 0x{residue:02X}")]
    InvalidFrame { residue: u8 },

    /// Declared frame-length nibble is not the one IT+ sensors send
    #[error("Unexpected frame length nibble: 0x{declared:X}")]
    UnexpectedLength { declared: u8 },

    /// Input could not be turned into a 5-byte frame
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Channel registration errors
    #[error("Registration error: {0}")]
    Registration(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Snapshot serialization errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl ItPlusError {
    /// Whether this error only rejects a single frame.
    ///
    /// Frame-level rejections are never fatal; the receiver keeps running.
    pub fn is_frame_rejection(&self) -> bool {
        matches!(
            self,
            ItPlusError::InvalidFrame { .. }
                | ItPlusError::UnexpectedLength { .. }
                | ItPlusError::MalformedFrame(_)
        )
    }
}

/// Result type alias for the IT+ receiver
pub type Result<T> = std::result::Result<T, ItPlusError>;
