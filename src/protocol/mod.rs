//! Protocol module - multiplexed stream wire format and frames.
//!
//! This module implements the framing used by log, attach and exec
//! endpoints when no terminal is attached:
//! - 8-byte header encoding/decoding
//! - Frame buffer for demultiplexing partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Header, StreamType, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE, STDERR_STREAM, STDIN_STREAM,
    STDOUT_STREAM,
};
