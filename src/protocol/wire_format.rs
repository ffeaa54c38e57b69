//! Wire format encoding and decoding.
//!
//! Implements the 8-byte multiplexed stream header:
//! ```text
//! ┌─────────────┬──────────┬──────────┐
//! │ Stream type │ Reserved │ Length   │
//! │ 1 byte      │ 3 bytes  │ 4 bytes  │
//! │             │ (zero)   │ uint32 BE│
//! └─────────────┴──────────┴──────────┘
//! ```
//!
//! The header is followed by exactly `length` payload bytes.

use std::fmt;

use crate::error::{Result, StreamError};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Stream type byte for data echoed from stdin.
pub const STDIN_STREAM: u8 = 0;

/// Stream type byte for standard output.
pub const STDOUT_STREAM: u8 = 1;

/// Stream type byte for standard error.
pub const STDERR_STREAM: u8 = 2;

/// Origin of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Standard output of the process.
    Stdout,
    /// Standard error of the process.
    Stderr,
    /// Terminal-attached output, no multiplexing header.
    Raw,
}

impl StreamType {
    /// Short lowercase name, used in logs and `Display`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Stdout => "stdout",
            StreamType::Stderr => "stderr",
            StreamType::Raw => "raw",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw stream type byte (0 stdin, 1 stdout, 2 stderr).
    pub stream: u8,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(stream: u8, payload_length: u32) -> Self {
        Self {
            stream,
            payload_length,
        }
    }

    /// Header for a stdout frame.
    pub fn stdout(payload_length: u32) -> Self {
        Self::new(STDOUT_STREAM, payload_length)
    }

    /// Header for a stderr frame.
    pub fn stderr(payload_length: u32) -> Self {
        Self::new(STDERR_STREAM, payload_length)
    }

    /// Encode header to bytes (Big Endian length, zeroed reserved bytes).
    ///
    /// # Example
    ///
    /// ```
    /// use engine_stream::protocol::Header;
    ///
    /// let bytes = Header::stdout(5).encode();
    /// assert_eq!(bytes, [1, 0, 0, 0, 0, 0, 0, 5]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.stream;
        buf[4..8].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short. The reserved bytes are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use engine_stream::protocol::Header;
    ///
    /// let header = Header::decode(&[2, 0, 0, 0, 0, 0, 1, 0]).unwrap();
    /// assert_eq!(header.stream, 2);
    /// assert_eq!(header.payload_length, 256);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            stream: buf[0],
            payload_length: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Map the stream byte to a deliverable [`StreamType`].
    ///
    /// Returns `Ok(None)` for stdin echo frames, which carry no output.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnknownStreamType`] for any byte other than 0, 1 or 2.
    pub fn stream_type(&self) -> Result<Option<StreamType>> {
        match self.stream {
            STDIN_STREAM => Ok(None),
            STDOUT_STREAM => Ok(Some(StreamType::Stdout)),
            STDERR_STREAM => Ok(Some(StreamType::Stderr)),
            other => Err(StreamError::UnknownStreamType(other)),
        }
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Stream type is 0, 1 or 2
    /// - Payload length doesn't exceed max
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        self.stream_type()?;

        if self.payload_length > max_payload_size {
            return Err(StreamError::PayloadTooLarge {
                size: self.payload_length,
                max: max_payload_size,
            });
        }

        Ok(())
    }

    /// Check if this header announces a stdin echo frame.
    #[inline]
    pub fn is_stdin(&self) -> bool {
        self.stream == STDIN_STREAM
    }
}

impl From<StreamType> for u8 {
    /// Wire byte for a stream type. `Raw` has no header and maps to stdout.
    fn from(stream_type: StreamType) -> u8 {
        match stream_type {
            StreamType::Stdout | StreamType::Raw => STDOUT_STREAM,
            StreamType::Stderr => STDERR_STREAM,
        }
    }
}
