//! Server module
//!
//! Background machinery of a queue client: the delayed promoter, the permit
//! ticker and the dispatcher, all stopped through one shared [`Shutdown`].

pub mod dispatcher;
pub mod inflight;
pub mod promoter;
pub mod rate_limit;
pub mod shutdown;

pub use dispatcher::Dispatcher;
pub use inflight::{InFlight, InFlightGuard};
pub use promoter::Promoter;
pub use rate_limit::{Permit, Permits, RateLimiter};
pub use shutdown::Shutdown;

use crate::config::QueueConfig;
use crate::processor::Handler;
use crate::storage::{QueueKeys, Store};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handles of the long-lived tasks of one queue
///
/// Dropping this without calling [`BackgroundTasks::shutdown`] leaves the
/// tasks running until the shared signal is triggered elsewhere.
pub struct BackgroundTasks {
    shutdown: Arc<Shutdown>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Start promoter, ticker and dispatcher for `keys`
    pub fn spawn(
        store: Arc<dyn Store>,
        keys: QueueKeys,
        handler: Arc<dyn Handler>,
        config: &QueueConfig,
        in_flight: Arc<InFlight>,
    ) -> Self {
        let shutdown = Arc::new(Shutdown::new());

        let promoter = Promoter::new(
            store.clone(),
            keys.clone(),
            config.poll_interval,
            config.error_backoff,
            shutdown.clone(),
        );

        let limiter = RateLimiter::new(config.effective_rate_limit(), config.rate_limit_period);
        let (permits, ticker) = limiter.spawn(shutdown.clone());

        let dispatcher = Dispatcher::new(store, keys, handler, permits, shutdown.clone())
            .in_flight(in_flight)
            .max_in_flight(config.max_in_flight)
            .error_backoff(config.error_backoff);

        let handles = vec![
            ("promoter", tokio::spawn(promoter.run())),
            ("ticker", ticker),
            ("dispatcher", tokio::spawn(dispatcher.run())),
        ];

        Self { shutdown, handles }
    }

    /// The signal observed by every task
    pub fn signal(&self) -> &Arc<Shutdown> {
        &self.shutdown
    }

    /// Signal cancellation and wait for every task to exit
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Background task {} ended abnormally: {}", name, e);
            }
        }
    }
}
