//! Transport module - the already-open connection a session reads from.
//!
//! Connection establishment (TCP, TLS, unix socket, proxies) and writing the
//! HTTP request belong to the caller. A session only needs the response body
//! as a byte stream it can read and finally release.

mod connection;

pub use connection::ReadOnly;

use std::io;

use tokio::io::AsyncRead;

use crate::consumer::BoxFuture;

/// Byte-readable, closable connection owned by one streaming session.
pub trait Connection: AsyncRead + Unpin + Send {
    /// Release the connection.
    ///
    /// Called exactly once when the session ends, whatever the cause. The
    /// connection is dropped right afterwards.
    fn release(&mut self) -> BoxFuture<'_, io::Result<()>>;
}
