//! Frame buffer for demultiplexing partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 8 bytes
//! - `WaitingForPayload`: Header parsed, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use engine_stream::protocol::{FrameBuffer, StreamType};
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Header arrives split across two reads
//! assert!(buffer.push(&[1, 0, 0, 0]).unwrap().is_empty());
//! let frames = buffer.push(&[0, 0, 0, 2, b'h', b'i']).unwrap();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].stream_type(), StreamType::Stdout);
//! assert_eq!(frames[0].payload(), b"hi");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, StreamType, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use super::Frame;
use crate::codec::{DecodeMode, Decoder};
use crate::error::{Result, StreamError};

/// Default buffer capacity (64KB).
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for complete header (need 8 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    /// `stream` is `None` for stdin echo frames, which are dropped.
    WaitingForPayload {
        stream: Option<StreamType>,
        remaining: u32,
    },
}

/// One step of the extraction loop.
enum Step {
    Frame(Frame),
    Skipped,
    NeedMore,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Decoding does not depend on how the input is split across `push` calls.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 1GB.
    pub fn new() -> Self {
        Self::with_capacity_and_max_payload(DEFAULT_CAPACITY, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self::with_capacity_and_max_payload(DEFAULT_CAPACITY, max_payload_size)
    }

    /// Create a new frame buffer with custom capacity and max payload.
    pub fn with_capacity_and_max_payload(capacity: usize, max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns the complete frames in wire order (may be empty if still
    /// waiting for data). Partial data is buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns error on an unknown stream type or a payload exceeding
    /// `max_payload_size`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        self.push_into(data, &mut frames)?;
        Ok(frames)
    }

    /// Like [`push`](Self::push), appending to `frames`.
    ///
    /// Frames that preceded a protocol violation stay in `frames`.
    pub fn push_into(&mut self, data: &[u8], frames: &mut Vec<Frame>) -> Result<()> {
        self.buffer.extend_from_slice(data);

        loop {
            match self.try_extract_one()? {
                Step::Frame(frame) => frames.push(frame),
                Step::Skipped => continue,
                Step::NeedMore => return Ok(()),
            }
        }
    }

    /// Signal end of input.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Truncated`] if the input stopped inside a header
    /// or payload.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            State::WaitingForHeader if self.buffer.is_empty() => Ok(()),
            _ => Err(StreamError::Truncated {
                buffered: self.buffer.len(),
            }),
        }
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Step> {
        match self.state {
            State::WaitingForHeader => {
                let header = match Header::decode(&self.buffer) {
                    Some(header) => header,
                    None => return Ok(Step::NeedMore),
                };

                header.validate(self.max_payload_size)?;
                let stream = header.stream_type()?;

                // Consume header bytes
                let _ = self.buffer.split_to(HEADER_SIZE);

                self.state = State::WaitingForPayload {
                    stream,
                    remaining: header.payload_length,
                };
                self.try_extract_one()
            }

            State::WaitingForPayload { stream, remaining } => {
                let remaining = remaining as usize;

                if self.buffer.len() < remaining {
                    return Ok(Step::NeedMore);
                }

                let payload = if remaining == 0 {
                    Bytes::new()
                } else {
                    self.buffer.split_to(remaining).freeze()
                };

                // Reset state for next frame
                self.state = State::WaitingForHeader;

                match stream {
                    Some(stream_type) => Ok(Step::Frame(Frame::new(stream_type, payload))),
                    None => {
                        tracing::trace!("Dropping {} byte stdin frame", payload.len());
                        Ok(Step::Skipped)
                    }
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameBuffer {
    type Item = Frame;

    fn mode(&self) -> DecodeMode {
        DecodeMode::Multiplexed
    }

    fn decode_into(&mut self, data: &[u8], out: &mut Vec<Frame>) -> Result<()> {
        self.push_into(data, out)
    }

    fn finish(&mut self) -> Result<()> {
        FrameBuffer::finish(self)
    }
}
