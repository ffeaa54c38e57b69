//! Session configuration.
//!
//! [`StreamConfig`] is set once when a stream starts. Use the fluent methods
//! to override defaults:
//!
//! ```
//! use std::time::Duration;
//! use engine_stream::{StreamConfig, TimeoutPolicy};
//!
//! let config = StreamConfig::new()
//!     .timeout(Duration::from_secs(5))
//!     .read_buffer_size(16 * 1024);
//!
//! assert_eq!(config.timeout, TimeoutPolicy::Overall(Duration::from_secs(5)));
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::codec::DEFAULT_RAW_CHUNK_SIZE;
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default read buffer size (64KB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// How long a stream may stay open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Stay open until end-of-stream, cancellation or failure.
    #[default]
    None,
    /// End the stream once this much time has passed since it started.
    Overall(Duration),
    /// End the stream when no bytes arrive for this long.
    Idle(Duration),
}

impl TimeoutPolicy {
    /// Build from a millisecond value where `0` means no timeout.
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            TimeoutPolicy::None
        } else {
            TimeoutPolicy::Overall(Duration::from_millis(millis))
        }
    }

    /// Deadline for the whole session, if any.
    ///
    /// A limit too large to represent as an instant means no deadline.
    pub(crate) fn session_deadline(&self, started: Instant) -> Option<Instant> {
        match self {
            TimeoutPolicy::Overall(limit) => started.checked_add(*limit),
            _ => None,
        }
    }

    /// Deadline for a single read starting now, bounded by the session deadline.
    pub(crate) fn read_deadline(&self, session_deadline: Option<Instant>) -> Option<Instant> {
        match self {
            TimeoutPolicy::Idle(limit) => Instant::now().checked_add(*limit),
            _ => session_deadline,
        }
    }
}

/// Configuration for one streaming session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Timeout policy.
    pub timeout: TimeoutPolicy,
    /// Size of the buffer handed to each connection read.
    pub read_buffer_size: usize,
    /// Largest multiplexed payload (or unfinished JSON value) accepted.
    pub max_payload_size: u32,
    /// Largest raw frame emitted for terminal-attached output.
    pub raw_chunk_size: usize,
    /// End the session cleanly after this many elements.
    pub element_limit: Option<usize>,
    /// Parent span for the session's diagnostics.
    pub span: Option<tracing::Span>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutPolicy::None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            raw_chunk_size: DEFAULT_RAW_CHUNK_SIZE,
            element_limit: None,
            span: None,
        }
    }
}

impl StreamConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// End the stream this long after it started.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = TimeoutPolicy::Overall(timeout);
        self
    }

    /// End the stream when no bytes arrive for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = TimeoutPolicy::Idle(timeout);
        self
    }

    /// Set the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout = policy;
        self
    }

    /// Set the read buffer size (clamped to at least 1).
    ///
    /// Default: 64KB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the maximum payload size.
    ///
    /// Default: 1GB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Set the maximum raw frame size (clamped to at least 1).
    ///
    /// Default: 32KB
    pub fn raw_chunk_size(mut self, size: usize) -> Self {
        self.raw_chunk_size = size.max(1);
        self
    }

    /// End the session after `limit` elements.
    pub fn element_limit(mut self, limit: usize) -> Self {
        self.element_limit = Some(limit);
        self
    }

    /// Attribute the session's diagnostics to `span`.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }
}
