//! Shutdown signal shared by the background loops

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// One-shot cancellation flag that can also be awaited
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown is requested
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger is not missed
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }

    /// Sleep for `duration`, returning `false` if shutdown interrupted it
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.wait() => false,
            _ = tokio::time::sleep(duration) => !self.is_triggered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_after_trigger_returns() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        shutdown.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_interrupts_sleep() {
        let shutdown = Arc::new(Shutdown::new());
        let sleeper = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.sleep(Duration::from_secs(3600)).await })
        };

        tokio::task::yield_now().await;
        shutdown.trigger();
        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(10)).await);
    }
}
