//! # Frame Source Module
//!
//! Delivers raw IT+ frames to the receiver.
//!
//! Radio reception itself happens outside this crate: a radio bridge (an
//! RFM12/RFM69 board running a sniffer sketch) prints every candidate frame
//! as a line of hex bytes. This module handles:
//! - Parsing hex lines into 5-byte frames
//! - Reading lines from a serial port or from standard input

pub mod serial;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{ItPlusError, Result};
use crate::itplus::protocol::{raw_frame_from_slice, RawFrame};

/// Producer of raw frames
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame
    ///
    /// Returns `Ok(None)` once the source is exhausted. A malformed line
    /// yields [`ItPlusError::MalformedFrame`]; the source stays usable.
    async fn next_frame(&mut self) -> Result<Option<RawFrame>>;
}

/// Frame source reading one hex-encoded frame per line
///
/// Accepted forms: `9F 23 18 45 65`, `9F:23:18:45:65`, `0x9F,0x23,...` and
/// `9F23184565`. Blank lines and text after `#` are ignored.
///
/// [`FrameSource::next_frame`] is cancel safe: a partially read line is kept
/// and completed by the next call.
#[derive(Debug)]
pub struct HexLineSource<R> {
    reader: R,
    line: Vec<u8>,
    line_number: u64,
}

impl<R> HexLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
        }
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[async_trait]
impl<R> FrameSource for HexLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.line).await?;
            if read == 0 && self.line.is_empty() {
                return Ok(None);
            }
            self.line_number += 1;

            // Line noise from the bridge is not valid UTF-8; let the parser reject it
            let parsed = parse_hex_line(&String::from_utf8_lossy(&self.line));
            self.line.clear();

            match parsed {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => continue,
                Err(ItPlusError::MalformedFrame(msg)) => {
                    return Err(ItPlusError::MalformedFrame(format!(
                        "line {}: {}",
                        self.line_number, msg
                    )))
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse one line of hex bytes into a frame
///
/// # Returns
///
/// * `Result<Option<RawFrame>>` - Frame, or `None` for a blank/comment line
///
/// # Examples
///
/// ```
/// use itplus_rx::source::parse_hex_line;
///
/// let frame = parse_hex_line("9F 23 18 45 65\n")?;
/// assert_eq!(frame, Some([0x9F, 0x23, 0x18, 0x45, 0x65]));
/// # Ok::<(), itplus_rx::error::ItPlusError>(())
/// ```
pub fn parse_hex_line(line: &str) -> Result<Option<RawFrame>> {
    let content = line.split('#').next().unwrap_or("").trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut bytes = Vec::with_capacity(5);
    for token in content.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.is_empty() {
            continue;
        }

        if !token.is_ascii() || token.len() % 2 != 0 {
            return Err(ItPlusError::MalformedFrame(format!(
                "invalid hex token '{}'",
                token
            )));
        }

        for i in (0..token.len()).step_by(2) {
            let byte = u8::from_str_radix(&token[i..i + 2], 16).map_err(|_| {
                ItPlusError::MalformedFrame(format!("invalid hex token '{}'", token))
            })?;
            bytes.push(byte);
        }
    }

    raw_frame_from_slice(&bytes).map(Some)
}
