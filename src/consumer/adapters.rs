//! Ready-made consumers.
//!
//! - [`FnConsumer`] - wraps a synchronous closure
//! - [`ChannelConsumer`] - forwards into a bounded mpsc channel
//! - [`CollectingConsumer`] - keeps every element in memory

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;

use super::{BoxFuture, ConsumerResult, StreamConsumer};
use crate::cancel::Cancellable;
use crate::error::BoxError;

/// Consumer backed by a closure.
///
/// # Example
///
/// ```
/// use engine_stream::consumer::{ConsumerResult, FnConsumer};
/// use engine_stream::Frame;
///
/// let consumer = FnConsumer::new(|frame: Frame| -> ConsumerResult {
///     print!("{}", frame.as_utf8_lossy());
///     Ok(())
/// });
/// ```
pub struct FnConsumer<F> {
    f: F,
    cancellable: Option<Cancellable>,
}

impl<F> FnConsumer<F> {
    /// Create a consumer calling `f` for every element.
    pub fn new(f: F) -> Self {
        Self {
            f,
            cancellable: None,
        }
    }

    /// Handle received in `on_starting`, if the stream has started.
    pub fn cancellable(&self) -> Option<&Cancellable> {
        self.cancellable.as_ref()
    }
}

impl<T, F> StreamConsumer<T> for FnConsumer<F>
where
    T: Send + 'static,
    F: FnMut(T) -> ConsumerResult + Send,
{
    fn on_starting(&mut self, cancellable: Cancellable) {
        self.cancellable = Some(cancellable);
    }

    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult> {
        let result = (self.f)(element);
        Box::pin(async move { result })
    }
}

/// Consumer that forwards elements into a bounded channel.
///
/// The session waits for channel capacity, so a slow receiver slows the
/// stream. Dropping the receiver fails the session on the next element.
pub struct ChannelConsumer<T> {
    tx: mpsc::Sender<T>,
    cancellable: Arc<OnceLock<Cancellable>>,
}

/// Receiving side of a [`ChannelConsumer`].
pub struct ElementReceiver<T> {
    rx: mpsc::Receiver<T>,
    cancellable: Arc<OnceLock<Cancellable>>,
}

impl<T> ChannelConsumer<T> {
    /// Create a consumer and its receiver with the given channel capacity.
    pub fn channel(capacity: usize) -> (Self, ElementReceiver<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancellable = Arc::new(OnceLock::new());
        (
            Self {
                tx,
                cancellable: cancellable.clone(),
            },
            ElementReceiver { rx, cancellable },
        )
    }
}

impl<T> StreamConsumer<T> for ChannelConsumer<T>
where
    T: Send + 'static,
{
    fn on_starting(&mut self, cancellable: Cancellable) {
        let _ = self.cancellable.set(cancellable);
    }

    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult> {
        Box::pin(async move {
            self.tx
                .send(element)
                .await
                .map_err(|_| BoxError::from("element receiver dropped"))
        })
    }
}

impl<T> ElementReceiver<T> {
    /// Receive the next element. Returns `None` once the session has ended
    /// and every element was received.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Handle of the session feeding this receiver, once it has started.
    pub fn cancellable(&self) -> Option<Cancellable> {
        self.cancellable.get().cloned()
    }

    /// Cancel the feeding session. No effect before it has started.
    pub fn cancel(&self) {
        if let Some(cancellable) = self.cancellable.get() {
            cancellable.cancel();
        }
    }
}

/// Consumer that keeps every element.
#[derive(Debug)]
pub struct CollectingConsumer<T> {
    elements: Vec<T>,
    cancellable: Option<Cancellable>,
    started: usize,
}

impl<T> CollectingConsumer<T> {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            cancellable: None,
            started: 0,
        }
    }

    /// Elements received so far.
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<T> {
        self.elements
    }

    /// Handle received in `on_starting`, if the stream has started.
    pub fn cancellable(&self) -> Option<&Cancellable> {
        self.cancellable.as_ref()
    }

    /// Number of `on_starting` calls seen.
    pub fn start_count(&self) -> usize {
        self.started
    }
}

impl<T> Default for CollectingConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamConsumer<T> for CollectingConsumer<T>
where
    T: Send + 'static,
{
    fn on_starting(&mut self, cancellable: Cancellable) {
        self.started += 1;
        self.cancellable = Some(cancellable);
    }

    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult> {
        self.elements.push(element);
        Box::pin(async { Ok(()) })
    }
}
