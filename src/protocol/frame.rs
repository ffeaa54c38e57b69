//! Frame struct with typed accessors.
//!
//! Represents one decoded unit of container output.
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use engine_stream::protocol::{Frame, StreamType};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(StreamType::Stdout, Bytes::from_static(b"hello"));
//!
//! assert_eq!(frame.stream_type(), StreamType::Stdout);
//! assert_eq!(frame.payload(), b"hello");
//! ```

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use super::wire_format::{Header, StreamType, HEADER_SIZE};

/// A decoded output frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Originating stream.
    pub stream_type: StreamType,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from stream type and payload.
    pub fn new(stream_type: StreamType, payload: Bytes) -> Self {
        Self {
            stream_type,
            payload,
        }
    }

    /// Create a frame from raw bytes (copies data).
    pub fn from_slice(stream_type: StreamType, payload: &[u8]) -> Self {
        Self {
            stream_type,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the originating stream.
    #[inline]
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a clone of the payload as Bytes (cheap, zero-copy).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Get the payload length.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[inline]
    pub fn is_stdout(&self) -> bool {
        self.stream_type == StreamType::Stdout
    }

    #[inline]
    pub fn is_stderr(&self) -> bool {
        self.stream_type == StreamType::Stderr
    }

    #[inline]
    pub fn is_raw(&self) -> bool {
        self.stream_type == StreamType::Raw
    }

    /// Payload as text, replacing invalid UTF-8 sequences.
    pub fn as_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stream_type, self.as_utf8_lossy())
    }
}

/// Build a multiplexed frame (header + payload) as a single byte vector.
///
/// # Panics
///
/// Panics if the payload is longer than `u32::MAX` bytes.
///
/// # Example
///
/// ```
/// use engine_stream::protocol::{build_frame, StreamType};
///
/// let bytes = build_frame(StreamType::Stdout, b"hello");
/// assert_eq!(bytes, b"\x01\x00\x00\x00\x00\x00\x00\x05hello");
/// ```
pub fn build_frame(stream_type: StreamType, payload: &[u8]) -> Vec<u8> {
    let length = u32::try_from(payload.len()).expect("frame payload exceeds u32::MAX");
    let header = Header::new(stream_type.into(), length);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}
