//! Cooperative cancellation handle shared between a session and its consumer.
//!
//! The session hands a [`Cancellable`] to the consumer in
//! [`StreamConsumer::on_starting`](crate::consumer::StreamConsumer::on_starting).
//! Any clone may be moved to another task or thread and cancelled from there.
//!
//! # Example
//!
//! ```
//! use engine_stream::Cancellable;
//!
//! let handle = Cancellable::new();
//! let other = handle.clone();
//!
//! other.cancel();
//! other.cancel(); // idempotent
//! assert!(handle.is_cancelled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::TerminationCause;

/// Sentinel stored while the session is still running.
const RUNNING: u8 = 0;

/// Shared state: the cancellation request and the recorded termination cause.
#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    cause: AtomicU8,
    notify: Notify,
}

/// Handle for the stream that is currently running.
///
/// Cheap to clone. All clones observe the same state.
#[derive(Clone)]
pub struct Cancellable {
    inner: Arc<Inner>,
}

impl Cancellable {
    /// Create a handle for a session that has not ended yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                cause: AtomicU8::new(RUNNING),
                notify: Notify::new(),
            }),
        }
    }

    /// Request termination of the stream.
    ///
    /// Returns immediately. The session observes the request asynchronously,
    /// so the connection may still be open when this returns. Calling it
    /// again, or after the stream has ended, has no further effect.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Check whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Why the session ended, or `None` while it is still running.
    pub fn termination(&self) -> Option<TerminationCause> {
        TerminationCause::from_u8(self.inner.cause.load(Ordering::Acquire))
    }

    /// Check whether the session has ended.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.termination().is_some()
    }

    /// Record the termination cause. Only the first call wins.
    pub(crate) fn record(&self, cause: TerminationCause) -> bool {
        self.inner
            .cause
            .compare_exchange(RUNNING, cause as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Cancellable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellable")
            .field("cancelled", &self.is_cancelled())
            .field("termination", &self.termination())
            .finish()
    }
}
