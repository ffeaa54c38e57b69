//! Codec module - incremental decoders for streaming response bodies.
//!
//! Each decoder is fed raw bytes as they arrive and returns the elements that
//! became complete:
//!
//! - [`FrameBuffer`](crate::protocol::FrameBuffer) - multiplexed stdout/stderr frames
//! - [`RawDecoder`] - terminal-attached output, passed through as `Raw` frames
//! - [`JsonObjectDecoder`] - a sequence of JSON values (stats, events)
//!
//! # Example
//!
//! ```
//! use engine_stream::codec::{Decoder, JsonObjectDecoder};
//! use serde_json::Value;
//!
//! let mut decoder = JsonObjectDecoder::<Value>::new();
//! assert!(decoder.decode(b"{\"status\":").unwrap().is_empty());
//! let values = decoder.decode(b"\"start\"}\n").unwrap();
//! assert_eq!(values[0]["status"], "start");
//! ```

mod json;
mod raw;

pub use json::JsonObjectDecoder;
pub use raw::{RawDecoder, DEFAULT_RAW_CHUNK_SIZE};

use crate::error::Result;

/// Incremental decoder driven by the stream session.
pub trait Decoder: Send {
    /// Element produced by this decoder.
    type Item: Send;

    /// How this decoder reads the body. Recorded in session diagnostics.
    fn mode(&self) -> DecodeMode;

    /// Feed newly read bytes and append every element that is now complete
    /// to `out`.
    ///
    /// On error, `out` still holds the elements that preceded the bad input.
    fn decode_into(&mut self, data: &[u8], out: &mut Vec<Self::Item>) -> Result<()>;

    /// Feed newly read bytes and return every element that is now complete.
    fn decode(&mut self, data: &[u8]) -> Result<Vec<Self::Item>> {
        let mut out = Vec::new();
        self.decode_into(data, &mut out)?;
        Ok(out)
    }

    /// Signal a clean end of input.
    ///
    /// Fails if bytes are buffered that never formed a complete element.
    fn finish(&mut self) -> Result<()>;
}

/// How a response body is decoded.
///
/// The wire bytes do not say whether a terminal is attached, so the caller
/// must choose; see [`DecodeMode::for_output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// 8-byte headers separate stdout and stderr.
    Multiplexed,
    /// Terminal-attached output, no headers.
    Raw,
    /// Sequence of JSON values.
    Json,
}

impl DecodeMode {
    /// Mode for log, attach and exec output of a container created with or
    /// without a terminal.
    pub fn for_output(tty: bool) -> Self {
        if tty {
            DecodeMode::Raw
        } else {
            DecodeMode::Multiplexed
        }
    }

    /// Short lowercase name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeMode::Multiplexed => "multiplexed",
            DecodeMode::Raw => "raw",
            DecodeMode::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_for_output() {
        assert_eq!(DecodeMode::for_output(true), DecodeMode::Raw);
        assert_eq!(DecodeMode::for_output(false), DecodeMode::Multiplexed);
    }

    #[test]
    fn test_decoders_report_mode() {
        assert_eq!(RawDecoder::new().mode(), DecodeMode::Raw);
        assert_eq!(JsonObjectDecoder::<serde_json::Value>::new().mode(), DecodeMode::Json);
        assert_eq!(
            crate::protocol::FrameBuffer::new().mode(),
            DecodeMode::Multiplexed
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(DecodeMode::Multiplexed.as_str(), "multiplexed");
        assert_eq!(DecodeMode::Raw.as_str(), "raw");
        assert_eq!(DecodeMode::Json.as_str(), "json");
    }
}
