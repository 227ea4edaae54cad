//! Delayed promoter
//!
//! Moves due entries from the delayed collection to the tail of the ready
//! list, one entry per store round trip, lowest score first.

use super::shutdown::Shutdown;
use crate::storage::{Promotion, QueueKeys, Store};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Promoter - feeds the ready list from the delayed collection
///
/// The loop never stops on store errors; it logs, idles for the error
/// backoff and tries again. After a promotion it continues immediately so a
/// backlog of due entries drains without idling.
pub struct Promoter {
    store: Arc<dyn Store>,
    keys: QueueKeys,
    poll_interval: Duration,
    error_backoff: Duration,
    shutdown: Arc<Shutdown>,
}

impl Promoter {
    /// Create a new promoter
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        keys: QueueKeys,
        poll_interval: Duration,
        error_backoff: Duration,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            store,
            keys,
            poll_interval,
            error_backoff,
            shutdown,
        }
    }

    /// Run until shutdown is requested
    pub async fn run(self) {
        tracing::info!("Promoter started for queue {}", self.keys.name());

        while !self.shutdown.is_triggered() {
            let idle = match self.promote_once().await {
                Ok(Promotion::Promoted { score, .. }) => {
                    tracing::debug!("Promoted entry with score {} to {}", score, self.keys.queued());
                    continue;
                }
                Ok(Promotion::Empty) => self.poll_interval,
                Ok(Promotion::NotDue { score }) => {
                    tracing::trace!("Head of {} not due until {}", self.keys.delayed(), score);
                    self.poll_interval
                }
                Err(e) => {
                    tracing::error!("Promotion error on queue {}: {}", self.keys.name(), e);
                    e.retry_after(self.error_backoff).unwrap_or(self.poll_interval)
                }
            };

            if !self.shutdown.sleep(idle).await {
                break;
            }
        }

        tracing::info!("Promoter stopped for queue {}", self.keys.name());
    }

    /// Run a single promotion attempt against the current wall clock
    pub async fn promote_once(&self) -> Result<Promotion> {
        self.store.promote_due(&self.keys, Utc::now().timestamp()).await
    }
}
