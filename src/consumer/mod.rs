//! Consumer module - how decoded elements reach caller code.
//!
//! Provides:
//! - [`StreamConsumer`] - the two-method contract driven by the session
//! - [`FnConsumer`], [`ChannelConsumer`], [`CollectingConsumer`] - ready-made consumers
//!
//! # Example
//!
//! ```ignore
//! use engine_stream::consumer::{BoxFuture, ConsumerResult, StreamConsumer};
//! use engine_stream::{Cancellable, Frame};
//!
//! struct Printer {
//!     job: Option<Cancellable>,
//! }
//!
//! impl StreamConsumer<Frame> for Printer {
//!     fn on_starting(&mut self, cancellable: Cancellable) {
//!         self.job = Some(cancellable);
//!     }
//!
//!     fn on_next(&mut self, frame: Frame) -> BoxFuture<'_, ConsumerResult> {
//!         Box::pin(async move {
//!             println!("{}", frame);
//!             Ok(())
//!         })
//!     }
//! }
//! ```

mod adapters;

pub use adapters::{ChannelConsumer, CollectingConsumer, ElementReceiver, FnConsumer};

use std::future::Future;
use std::pin::Pin;

use crate::cancel::Cancellable;
use crate::error::BoxError;

/// Result type for consumer callbacks.
pub type ConsumerResult = std::result::Result<(), BoxError>;

/// Boxed future for consumer callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receiver of decoded stream elements.
///
/// For one session the calls arrive in this order: `on_starting` exactly
/// once, then `on_next` once per element in decode order. Calls never
/// overlap. The session awaits each `on_next` before reading further, so a
/// slow consumer slows the stream down.
pub trait StreamConsumer<T>: Send {
    /// Called before the first element, even if the stream ends empty.
    ///
    /// Keep the handle to cancel the stream later. Must return quickly.
    fn on_starting(&mut self, cancellable: Cancellable);

    /// Called once per decoded element.
    ///
    /// Returning an error aborts the session with a transport error; no
    /// further elements are delivered.
    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult>;
}

impl<T, C> StreamConsumer<T> for &mut C
where
    C: StreamConsumer<T> + ?Sized,
{
    fn on_starting(&mut self, cancellable: Cancellable) {
        (**self).on_starting(cancellable)
    }

    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult> {
        (**self).on_next(element)
    }
}

impl<T, C> StreamConsumer<T> for Box<C>
where
    C: StreamConsumer<T> + ?Sized,
{
    fn on_starting(&mut self, cancellable: Cancellable) {
        (**self).on_starting(cancellable)
    }

    fn on_next(&mut self, element: T) -> BoxFuture<'_, ConsumerResult> {
        (**self).on_next(element)
    }
}
