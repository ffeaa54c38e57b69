//! # engine-stream
//!
//! Cancellable streaming core for container-engine HTTP endpoints.
//!
//! Log, attach and exec output, resource usage samples and engine events
//! arrive as open-ended response bodies. This crate decodes such a body
//! incrementally and delivers each element to a consumer while the
//! connection stays open, until the remote closes it, the caller cancels or
//! a timeout elapses.
//!
//! ## Architecture
//!
//! - **Consumer** ([`StreamConsumer`]): `on_starting` once, then `on_next` per element
//! - **Cancellation** ([`Cancellable`]): cooperative, idempotent, usable from any task
//! - **Demultiplexing** ([`protocol`]): 8-byte headers split stdout from stderr
//! - **Lifecycle** ([`StreamDriver`]): read, decode, deliver, release
//!
//! Opening the connection and writing the HTTP request is left to the caller.
//!
//! ## Example
//!
//! ```no_run
//! use engine_stream::consumer::FnConsumer;
//! use engine_stream::endpoint::{container_logs, LogsOptions};
//! use engine_stream::{Frame, StreamConfig};
//! use std::time::Duration;
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = TcpStream::connect("127.0.0.1:2375").await?;
//!     // ... send `GET /containers/web/logs?follow=1&stdout=1&stderr=1` ...
//!
//!     let printer = FnConsumer::new(|frame: Frame| -> engine_stream::consumer::ConsumerResult {
//!         print!("{}", frame);
//!         Ok(())
//!     });
//!     let config = StreamConfig::new().idle_timeout(Duration::from_secs(30));
//!
//!     let outcome = container_logs(conn, LogsOptions::tty(false), printer, config).await?;
//!     println!("stream ended: {:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod codec;
pub mod config;
pub mod consumer;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use cancel::Cancellable;
pub use codec::DecodeMode;
pub use config::{StreamConfig, TimeoutPolicy};
pub use consumer::StreamConsumer;
pub use endpoint::{
    container_attach, container_logs, container_stats, exec_start, system_events, LogsOptions,
    StatsOptions,
};
pub use error::{ErrorKind, Result, StreamError, StreamOutcome, TerminationCause};
pub use protocol::{Frame, StreamType};
pub use session::{StreamDriver, StreamHandle};
pub use transport::{Connection, ReadOnly};
