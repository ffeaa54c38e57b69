//! Connection implementations for common stream types.
//!
//! - TCP: `tokio::net::TcpStream`
//! - Unix: `tokio::net::UnixStream` (engine socket, unix only)
//! - In-memory: `tokio::io::DuplexStream`
//! - Any reader: [`ReadOnly`]
//!
//! # Example
//!
//! ```ignore
//! use engine_stream::transport::Connection;
//! use tokio::net::UnixStream;
//!
//! // Request line and headers already written and the response head consumed
//! // by the HTTP layer; only the streaming body remains.
//! let conn: UnixStream = http_layer.open_logs("my-container").await?;
//! ```

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::net::TcpStream;

use super::Connection;
use crate::consumer::BoxFuture;

impl Connection for TcpStream {
    fn release(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(self.shutdown())
    }
}

impl Connection for DuplexStream {
    fn release(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(self.shutdown())
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use tokio::net::UnixStream;

    impl Connection for UnixStream {
        fn release(&mut self) -> BoxFuture<'_, io::Result<()>> {
            Box::pin(self.shutdown())
        }
    }
}

impl<C> Connection for Box<C>
where
    C: Connection + ?Sized,
{
    fn release(&mut self) -> BoxFuture<'_, io::Result<()>> {
        (**self).release()
    }
}

/// Wrapper turning any reader into a [`Connection`].
///
/// Releasing does nothing; the reader is closed when the session drops it.
#[derive(Debug)]
pub struct ReadOnly<R> {
    reader: R,
}

impl<R> ReadOnly<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Get a reference to the underlying reader.
    pub fn inner(&self) -> &R {
        &self.reader
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> AsyncRead for ReadOnly<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

impl<R> Connection for ReadOnly<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn release(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
