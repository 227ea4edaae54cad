//! Processor module
//!
//! Provides the Handler trait invoked for every dispatched message

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Handler trait - message processor
///
/// Receives the serialized envelope exactly as it was stored; use
/// [`crate::Envelope::decode`] to get at the payload. The outcome is not
/// observed by the queue: failures, retries and logging are the handler's
/// concern.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one message
    async fn handle(&self, message: String);
}

/// Handler built from an async closure, see [`handler_fn`]
pub struct HandlerFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a [`Handler`]
///
/// # Example
///
/// ```rust
/// use delayq::processor::handler_fn;
///
/// let handler = handler_fn(|message: String| async move {
///     println!("got {}", message);
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    HandlerFn { f, _fut: PhantomData }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: String) {
        (self.f)(message).await
    }
}
