//! Error types and termination causes for engine-stream.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by consumers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for a failed streaming session.
///
/// Cancellation, timeouts and a clean end-of-stream are not errors; they are
/// reported through [`StreamOutcome`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// I/O error while reading from the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON-object stream carried bytes that are not valid JSON
    /// or do not match the requested element type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed header, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Multiplexed frame header carried a stream type the protocol does not define.
    #[error("Unknown stream type: {0}")]
    UnknownStreamType(u8),

    /// Multiplexed frame header declared a payload above the configured maximum.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Declared payload length.
        size: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Connection closed in the middle of a header, payload or JSON value.
    #[error("Stream truncated with {buffered} undecoded bytes")]
    Truncated {
        /// Bytes that were buffered but never formed a complete element.
        buffered: usize,
    },

    /// The consumer rejected an element.
    #[error("Consumer error: {0}")]
    Consumer(#[source] BoxError),
}

/// Coarse classification of [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote sent bytes that violate the wire format.
    ProtocolViolation,
    /// The connection failed, ended early, or the consumer failed.
    Transport,
}

impl StreamError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Json(e) if e.is_io() || e.is_eof() => ErrorKind::Transport,
            StreamError::Json(_)
            | StreamError::Protocol(_)
            | StreamError::UnknownStreamType(_)
            | StreamError::PayloadTooLarge { .. } => ErrorKind::ProtocolViolation,
            StreamError::Io(_) | StreamError::Truncated { .. } | StreamError::Consumer(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// Check if this error is a wire-format violation.
    #[inline]
    pub fn is_protocol_violation(&self) -> bool {
        self.kind() == ErrorKind::ProtocolViolation
    }

    /// Build a consumer error from any error value.
    pub fn consumer<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StreamError::Consumer(err.into())
    }
}

/// Result type alias using StreamError.
pub type Result<T> = std::result::Result<T, StreamError>;

/// How a session ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The remote closed the stream cleanly.
    EndOfStream,
    /// Someone holding the [`Cancellable`](crate::Cancellable) cancelled it.
    Cancelled,
    /// The configured timeout elapsed.
    TimedOut,
}

/// Recorded reason a session ended, including failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TerminationCause {
    /// Cancelled by the consumer or another holder of the handle.
    Cancelled = 1,
    /// Timeout elapsed.
    TimedOut = 2,
    /// Remote closed the stream.
    EndOfStream = 3,
    /// I/O failure, protocol violation or consumer failure.
    TransportError = 4,
}

impl TerminationCause {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(TerminationCause::Cancelled),
            2 => Some(TerminationCause::TimedOut),
            3 => Some(TerminationCause::EndOfStream),
            4 => Some(TerminationCause::TransportError),
            _ => None,
        }
    }
}

impl From<StreamOutcome> for TerminationCause {
    fn from(outcome: StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::EndOfStream => TerminationCause::EndOfStream,
            StreamOutcome::Cancelled => TerminationCause::Cancelled,
            StreamOutcome::TimedOut => TerminationCause::TimedOut,
        }
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationCause::Cancelled => "cancelled",
            TerminationCause::TimedOut => "timed out",
            TerminationCause::EndOfStream => "end of stream",
            TerminationCause::TransportError => "transport error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            StreamError::UnknownStreamType(7).kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            StreamError::PayloadTooLarge { size: 10, max: 1 }.kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            StreamError::Truncated { buffered: 3 }.kind(),
            ErrorKind::Transport
        );
        assert_eq!(StreamError::consumer("boom").kind(), ErrorKind::Transport);

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(StreamError::from(io).kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_invalid_json_is_protocol_violation() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{]").unwrap_err();
        assert!(StreamError::from(err).is_protocol_violation());
    }

    #[test]
    fn test_termination_cause_roundtrip() {
        for cause in [
            TerminationCause::Cancelled,
            TerminationCause::TimedOut,
            TerminationCause::EndOfStream,
            TerminationCause::TransportError,
        ] {
            assert_eq!(TerminationCause::from_u8(cause as u8), Some(cause));
        }
        assert_eq!(TerminationCause::from_u8(0), None);
    }

    #[test]
    fn test_outcome_to_cause() {
        assert_eq!(
            TerminationCause::from(StreamOutcome::Cancelled),
            TerminationCause::Cancelled
        );
        assert_eq!(
            TerminationCause::from(StreamOutcome::TimedOut),
            TerminationCause::TimedOut
        );
        assert_eq!(
            TerminationCause::from(StreamOutcome::EndOfStream),
            TerminationCause::EndOfStream
        );
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            StreamError::UnknownStreamType(9).to_string(),
            "Unknown stream type: 9"
        );
        assert_eq!(TerminationCause::TimedOut.to_string(), "timed out");
    }
}
