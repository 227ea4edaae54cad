//! Dispatcher implementation
//!
//! The dispatcher spends one permit per pop of the ready list and hands each
//! popped message to the handler in its own task.

use super::inflight::InFlight;
use super::rate_limit::Permits;
use super::shutdown::Shutdown;
use crate::processor::Handler;
use crate::storage::{QueueKeys, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Dispatcher - rate-limited consumer of the ready list
pub struct Dispatcher {
    store: Arc<dyn Store>,
    keys: QueueKeys,
    handler: Arc<dyn Handler>,
    permits: Permits,
    shutdown: Arc<Shutdown>,
    in_flight: Arc<InFlight>,
    slots: Option<Arc<Semaphore>>,
    error_backoff: Duration,
}

impl Dispatcher {
    /// Create a new dispatcher with uncapped concurrency
    pub fn new(
        store: Arc<dyn Store>,
        keys: QueueKeys,
        handler: Arc<dyn Handler>,
        permits: Permits,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            store,
            keys,
            handler,
            permits,
            shutdown,
            in_flight: Arc::new(InFlight::new()),
            slots: None,
            error_backoff: Duration::from_millis(500),
        }
    }

    /// Share an in-flight tracker with the caller
    #[must_use]
    pub fn in_flight(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Cap concurrently running handlers
    #[must_use]
    pub fn max_in_flight(mut self, max: Option<usize>) -> Self {
        self.slots = max.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Idle after a store error
    #[must_use]
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Run until shutdown is requested or the permit source stops
    pub async fn run(mut self) {
        tracing::info!("Dispatcher started for queue {}", self.keys.name());

        loop {
            let _permit = tokio::select! {
                _ = self.shutdown.wait() => break,
                permit = self.permits.acquire() => match permit {
                    Some(permit) => permit,
                    None => break,
                },
            };

            // Take the concurrency slot before popping so a popped message always starts
            let slot = match self.slots.clone() {
                Some(slots) => tokio::select! {
                    _ = self.shutdown.wait() => break,
                    slot = slots.acquire_owned() => match slot {
                        Ok(slot) => Some(slot),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            match self.store.lpop(self.keys.queued()).await {
                Ok(Some(message)) => self.spawn_handler(message, slot),
                Ok(None) => {
                    tracing::trace!("Ready list {} empty, permit discarded", self.keys.queued());
                }
                Err(e) => {
                    tracing::error!("Dequeue error on queue {}: {}", self.keys.name(), e);
                    let Some(backoff) = e.retry_after(self.error_backoff) else {
                        continue;
                    };
                    if !self.shutdown.sleep(backoff).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Dispatcher stopped for queue {}", self.keys.name());
    }

    fn spawn_handler(&self, message: String, slot: Option<OwnedSemaphorePermit>) {
        let guard = self.in_flight.start();
        let handler = Arc::clone(&self.handler);
        tracing::debug!("Dispatching message from {}", self.keys.queued());

        tokio::spawn(async move {
            let _guard = guard;
            let _slot = slot;
            handler.handle(message).await;
        });
    }
}
