//! Stream session - drives one connection from first read to release.
//!
//! A [`StreamDriver`] owns the connection and a decoder for the lifetime of
//! one streaming request:
//! 1. Hand the consumer a [`Cancellable`] via `on_starting`
//! 2. Read bytes, decode, deliver elements in order
//! 3. Stop on end-of-stream, cancellation, timeout or failure
//! 4. Release the connection and record why the session ended
//!
//! Reads race against cancellation and the timeout, so an idle connection
//! never keeps a cancelled session alive.
//!
//! # Example
//!
//! ```no_run
//! use engine_stream::codec::RawDecoder;
//! use engine_stream::consumer::CollectingConsumer;
//! use engine_stream::{StreamConfig, StreamDriver};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> engine_stream::Result<()> {
//! let conn = TcpStream::connect("127.0.0.1:2375").await?;
//! // ... write the HTTP request and consume the response head ...
//! let mut frames = CollectingConsumer::new();
//! let driver = StreamDriver::new(conn, RawDecoder::new(), StreamConfig::new());
//! let outcome = driver.run(&mut frames).await?;
//! println!("{:?}: {} frames", outcome, frames.elements().len());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use crate::cancel::Cancellable;
use crate::codec::Decoder;
use crate::config::StreamConfig;
use crate::consumer::StreamConsumer;
use crate::error::{Result, StreamError, StreamOutcome, TerminationCause};
use crate::transport::Connection;

/// Source of per-process session ids for diagnostics.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Result of one guarded read.
enum Read {
    Data(usize),
    Eof,
    Cancelled,
    TimedOut,
}

/// Drives one streaming session over an open connection.
pub struct StreamDriver<C, D> {
    conn: C,
    decoder: D,
    config: StreamConfig,
    cancellable: Cancellable,
}

impl<C, D> StreamDriver<C, D>
where
    C: Connection,
    D: Decoder,
{
    /// Create a driver. Nothing is read until [`run`](Self::run) or
    /// [`spawn`](Self::spawn).
    pub fn new(conn: C, decoder: D, config: StreamConfig) -> Self {
        Self {
            conn,
            decoder,
            config,
            cancellable: Cancellable::new(),
        }
    }

    /// Handle that will be passed to the consumer.
    ///
    /// Cancelling it before the session starts makes the session end
    /// without reading.
    pub fn cancellable(&self) -> Cancellable {
        self.cancellable.clone()
    }

    /// Configuration of this session.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run the session to completion on the current task.
    ///
    /// Returns how the session ended. Cancellation and timeouts are not
    /// errors. The connection is released before this returns, on every path.
    ///
    /// # Errors
    ///
    /// Returns the I/O error, protocol violation, truncation or consumer
    /// error that ended the session.
    pub async fn run<S>(self, consumer: S) -> Result<StreamOutcome>
    where
        S: StreamConsumer<D::Item>,
    {
        let span = self.session_span();
        self.run_session(consumer).instrument(span).await
    }

    /// Run the session on a new tokio task.
    pub fn spawn<S>(self, consumer: S) -> StreamHandle
    where
        C: 'static,
        D: 'static,
        S: StreamConsumer<D::Item> + 'static,
    {
        let cancellable = self.cancellable.clone();
        let task = tokio::spawn(self.run(consumer));
        StreamHandle { cancellable, task }
    }

    fn session_span(&self) -> tracing::Span {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let mode = self.decoder.mode().as_str();
        match &self.config.span {
            Some(parent) => {
                tracing::debug_span!(parent: parent, "stream_session", session = id, mode)
            }
            None => tracing::debug_span!("stream_session", session = id, mode),
        }
    }

    async fn run_session<S>(mut self, mut consumer: S) -> Result<StreamOutcome>
    where
        S: StreamConsumer<D::Item>,
    {
        tracing::debug!("Stream starting, timeout {:?}", self.config.timeout);
        consumer.on_starting(self.cancellable.clone());

        let result = self.read_loop(&mut consumer).await;

        if let Err(e) = self.conn.release().await {
            tracing::debug!("Connection release failed: {}", e);
        }

        let cause = match &result {
            Ok(outcome) => TerminationCause::from(*outcome),
            Err(_) => TerminationCause::TransportError,
        };
        self.cancellable.record(cause);

        match &result {
            Ok(outcome) => tracing::debug!("Stream ended: {:?}", outcome),
            Err(e) => tracing::warn!("Stream failed: {}", e),
        }

        result
    }

    /// Main read loop - reads, decodes and delivers until the session ends.
    async fn read_loop<S>(&mut self, consumer: &mut S) -> Result<StreamOutcome>
    where
        S: StreamConsumer<D::Item>,
    {
        let session_deadline = self.config.timeout.session_deadline(Instant::now());
        let mut buf = vec![0u8; self.config.read_buffer_size];
        let mut elements = Vec::new();
        let mut delivered = 0usize;

        loop {
            if self.limit_reached(delivered) {
                return Ok(StreamOutcome::EndOfStream);
            }
            if self.cancellable.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }
            if session_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(StreamOutcome::TimedOut);
            }

            let n = match self.read_next(&mut buf, session_deadline).await? {
                Read::Data(n) => n,
                Read::Eof => {
                    self.decoder.finish()?;
                    return Ok(StreamOutcome::EndOfStream);
                }
                Read::Cancelled => return Ok(StreamOutcome::Cancelled),
                Read::TimedOut => return Ok(StreamOutcome::TimedOut),
            };
            tracing::trace!("Read {} bytes", n);

            // Elements decoded ahead of a violation are still delivered
            let decoded = self.decoder.decode_into(&buf[..n], &mut elements);

            for element in elements.drain(..) {
                if self.cancellable.is_cancelled() {
                    discard(decoded, StreamOutcome::Cancelled);
                    return Ok(StreamOutcome::Cancelled);
                }
                consumer
                    .on_next(element)
                    .await
                    .map_err(StreamError::Consumer)?;

                delivered += 1;
                if self.limit_reached(delivered) {
                    discard(decoded, StreamOutcome::EndOfStream);
                    return Ok(StreamOutcome::EndOfStream);
                }
            }

            decoded?;
        }
    }

    /// Read once, unless cancellation or the deadline comes first.
    async fn read_next(&mut self, buf: &mut [u8], session_deadline: Option<Instant>) -> Result<Read> {
        let deadline = self.config.timeout.read_deadline(session_deadline);
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellable.cancelled() => Ok(Read::Cancelled),
            read = self.conn.read(buf) => match read {
                Ok(0) => Ok(Read::Eof),
                Ok(n) => Ok(Read::Data(n)),
                Err(e) => Err(StreamError::Io(e)),
            },
            _ = expired => Ok(Read::TimedOut),
        }
    }

    #[inline]
    fn limit_reached(&self, delivered: usize) -> bool {
        self.config
            .element_limit
            .is_some_and(|limit| delivered >= limit)
    }
}

/// Log a decode error that lost the race against another way of ending.
fn discard(decoded: Result<()>, outcome: StreamOutcome) {
    if let Err(e) = decoded {
        tracing::warn!("Ending as {:?}, dropping decode error: {}", outcome, e);
    }
}

/// Handle to a session running on its own task.
#[derive(Debug)]
pub struct StreamHandle {
    cancellable: Cancellable,
    task: JoinHandle<Result<StreamOutcome>>,
}

impl StreamHandle {
    /// The session's cancellation handle.
    pub fn cancellable(&self) -> &Cancellable {
        &self.cancellable
    }

    /// Request cancellation. See [`Cancellable::cancel`].
    pub fn cancel(&self) {
        self.cancellable.cancel();
    }

    /// Check whether the session task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    ///
    /// A panic inside the consumer is resumed on the caller. If the runtime
    /// dropped the task, the session counts as cancelled.
    pub async fn join(self) -> Result<StreamOutcome> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {
                self.cancellable.record(TerminationCause::Cancelled);
                Ok(StreamOutcome::Cancelled)
            }
        }
    }
}
