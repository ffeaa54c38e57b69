//! Raw decoder - pass-through for terminal-attached output.
//!
//! A container started with a pseudo-terminal writes its output without
//! multiplexing headers. Bytes are emitted as [`StreamType::Raw`] frames in
//! arrival order, split into frames of at most `chunk_size` bytes. Control
//! bytes are not interpreted.
//!
//! # Example
//!
//! ```
//! use engine_stream::codec::{Decoder, RawDecoder};
//!
//! let mut decoder = RawDecoder::with_chunk_size(4);
//! let frames = decoder.decode(b"\x1b[1mbold").unwrap();
//!
//! assert_eq!(frames.len(), 2);
//! assert_eq!(frames[0].payload(), b"\x1b[1m");
//! assert_eq!(frames[1].payload(), b"bold");
//! ```

use bytes::Bytes;

use super::{DecodeMode, Decoder};
use crate::error::Result;
use crate::protocol::{Frame, StreamType};

/// Default maximum size of a raw frame (32KB).
pub const DEFAULT_RAW_CHUNK_SIZE: usize = 32 * 1024;

/// Decoder that tags every byte as terminal output.
#[derive(Debug, Clone)]
pub struct RawDecoder {
    chunk_size: usize,
}

impl RawDecoder {
    /// Create a raw decoder with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_RAW_CHUNK_SIZE)
    }

    /// Create a raw decoder with a custom chunk size (clamped to at least 1).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Maximum payload size of an emitted frame.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for RawDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RawDecoder {
    type Item = Frame;

    fn mode(&self) -> DecodeMode {
        DecodeMode::Raw
    }

    fn decode_into(&mut self, data: &[u8], out: &mut Vec<Frame>) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        // One copy, then zero-copy slices per frame
        let bytes = Bytes::copy_from_slice(data);
        out.extend((0..bytes.len()).step_by(self.chunk_size).map(|start| {
            let end = (start + self.chunk_size).min(bytes.len());
            Frame::new(StreamType::Raw, bytes.slice(start..end))
        }));

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
