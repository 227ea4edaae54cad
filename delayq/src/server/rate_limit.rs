//! Rate limiter
//!
//! A ticker task issues one permit every `period / rate` into a channel that
//! buffers at most `rate` permits. Permits that find the buffer full are
//! dropped, so idle time never accumulates credit beyond one period's worth.

use super::shutdown::Shutdown;
use crate::config::DEFAULT_RATE_LIMIT;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A unit of dispatch quota
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    /// When the ticker issued it
    pub issued_at: Instant,
}

/// Receiving side of the permit channel
#[derive(Debug)]
pub struct Permits {
    rx: mpsc::Receiver<Permit>,
}

impl Permits {
    /// Wait for the next permit; `None` once the ticker has stopped
    pub async fn acquire(&mut self) -> Option<Permit> {
        self.rx.recv().await
    }

    /// Take a buffered permit without waiting
    pub fn try_acquire(&mut self) -> Option<Permit> {
        self.rx.try_recv().ok()
    }
}

/// Token source admitting at most `rate` permits per `period`
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    rate: u32,
    period: Duration,
}

impl RateLimiter {
    /// Create a limiter; a zero rate falls back to the default
    pub fn new(rate: u32, period: Duration) -> Self {
        let rate = if rate == 0 { DEFAULT_RATE_LIMIT } else { rate };
        Self { rate, period }
    }

    /// Permits per period
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Time between two permits
    pub fn cadence(&self) -> Duration {
        (self.period / self.rate).max(Duration::from_nanos(1))
    }

    /// Start the ticker task
    pub fn spawn(self, shutdown: Arc<Shutdown>) -> (Permits, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.rate as usize);
        let handle = tokio::spawn(self.run(tx, shutdown));
        (Permits { rx }, handle)
    }

    async fn run(self, tx: mpsc::Sender<Permit>, shutdown: Arc<Shutdown>) {
        let cadence = self.cadence();
        tracing::debug!("Rate limiter started: {} permits per {:?} (every {:?})", self.rate, self.period, cadence);

        let mut ticker = tokio::time::interval_at(Instant::now() + cadence, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                issued_at = ticker.tick() => match tx.try_send(Permit { issued_at }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        tracing::trace!("Permit buffer full, {} permits dropped so far", dropped);
                    }
                    Err(TrySendError::Closed(_)) => break,
                },
            }
        }

        tracing::debug!("Rate limiter stopped ({} permits dropped)", dropped);
    }
}
