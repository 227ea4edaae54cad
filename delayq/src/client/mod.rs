//! Client SDK
//!
//! Provides the queue client, the producer-only handle and inspection.

pub mod builder;

use crate::envelope::Envelope;
use crate::server::{BackgroundTasks, InFlight, Shutdown};
use crate::storage::{QueueKeys, Store};
use crate::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use builder::QueueBuilder;

/// Producer - pushes envelopes and reads queue state
///
/// Does not dispatch anything itself.
#[derive(Clone)]
pub struct Producer {
    store: Arc<dyn Store>,
    keys: QueueKeys,
}

impl Producer {
    pub(crate) fn new(store: Arc<dyn Store>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Keys of the queue
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Add an envelope to the delayed collection at its score
    ///
    /// Pushing an envelope identical to one already waiting is a no-op.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Serialization`] if the payload cannot be encoded,
    /// [`crate::Error::StoreWrite`] if the store rejects the write.
    pub async fn push(&self, envelope: &Envelope) -> Result<()> {
        let member = envelope.encode()?;
        let added = self.store.zadd_nx(self.keys.delayed(), &member, envelope.score).await?;

        if added {
            tracing::debug!("Envelope pushed to {} with score {}", self.keys.delayed(), envelope.score);
        } else {
            tracing::debug!("Identical envelope already in {}, push ignored", self.keys.delayed());
        }
        Ok(())
    }

    /// Number of entries waiting in the delayed collection
    pub async fn delayed_len(&self) -> Result<u64> {
        self.store.zcard(self.keys.delayed()).await
    }

    /// Number of entries waiting in the ready list
    pub async fn queued_len(&self) -> Result<u64> {
        self.store.llen(self.keys.queued()).await
    }

    /// Get inspector
    pub fn inspector(&self) -> Inspector {
        Inspector::new(self.store.clone(), self.keys.clone())
    }

    /// Release the store connection
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

/// Queue - delayed, rate-limited queue client
///
/// Cloning yields another handle to the same queue. Dropping the last handle
/// signals the background tasks to stop without waiting for them; call
/// [`Queue::shutdown`] to wait.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    producer: Producer,
    in_flight: Arc<InFlight>,
    signal: Arc<Shutdown>,
    tasks: Mutex<Option<BackgroundTasks>>,
    /// Whether the builder opened the store, and so closes it on shutdown
    owns_store: bool,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        self.signal.trigger();
    }
}

impl Queue {
    pub(crate) fn new(
        producer: Producer,
        in_flight: Arc<InFlight>,
        tasks: BackgroundTasks,
        owns_store: bool,
    ) -> Self {
        let signal = tasks.signal().clone();
        Self {
            inner: Arc::new(QueueInner {
                producer,
                in_flight,
                signal,
                tasks: Mutex::new(Some(tasks)),
                owns_store,
            }),
        }
    }

    /// Create a new queue builder
    pub fn builder() -> QueueBuilder {
        QueueBuilder::default()
    }

    /// Queue name
    pub fn name(&self) -> &str {
        self.inner.producer.keys().name()
    }

    /// Keys of the queue
    pub fn keys(&self) -> &QueueKeys {
        self.inner.producer.keys()
    }

    /// Add an envelope to the delayed collection, see [`Producer::push`]
    pub async fn push(&self, envelope: &Envelope) -> Result<()> {
        self.inner.producer.push(envelope).await
    }

    /// Number of entries waiting in the delayed collection
    pub async fn delayed_len(&self) -> Result<u64> {
        self.inner.producer.delayed_len().await
    }

    /// Number of entries waiting in the ready list
    pub async fn queued_len(&self) -> Result<u64> {
        self.inner.producer.queued_len().await
    }

    /// Number of running handler invocations
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.count()
    }

    /// Wait until every started handler invocation has completed
    ///
    /// Dispatching continues meanwhile; this only observes the in-flight
    /// count reaching zero.
    pub async fn wait(&self) {
        self.inner.in_flight.wait_idle().await;
    }

    /// Delayed, ready and in-flight counts
    pub async fn stats(&self) -> Result<QueueStats> {
        let mut stats = self.inspector().stats().await?;
        stats.in_flight = self.in_flight();
        Ok(stats)
    }

    /// Get inspector
    pub fn inspector(&self) -> Inspector {
        self.inner.producer.inspector()
    }

    /// Stop the background tasks and wait for them to exit
    ///
    /// The store is closed only if [`QueueBuilder::build`] opened it; a store
    /// handed to [`QueueBuilder::build_with_store`] stays open for its owner.
    /// Running handler invocations are not awaited; use [`Queue::wait`]
    /// afterwards to drain them. Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(tasks) = self.inner.tasks.lock().await.take() else {
            return Ok(());
        };

        tracing::info!("Shutting down queue {}", self.name());
        tasks.shutdown().await;
        if self.inner.owns_store {
            self.inner.producer.close().await?;
        }
        tracing::info!("Queue {} stopped", self.name());
        Ok(())
    }
}

/// Queue inspector
///
/// Reads the collections without modifying them
pub struct Inspector {
    store: Arc<dyn Store>,
    keys: QueueKeys,
}

impl Inspector {
    /// Create a new inspector
    pub fn new(store: Arc<dyn Store>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Up to `limit` delayed envelopes with their scores, lowest score first
    pub async fn delayed(&self, limit: usize) -> Result<Vec<(Envelope, i64)>> {
        let Some(stop) = last_index(limit) else {
            return Ok(Vec::new());
        };
        let members = self.store.zrange_with_scores(self.keys.delayed(), 0, stop).await?;
        Ok(members
            .into_iter()
            .filter_map(|(member, score)| self.decode(&member).map(|envelope| (envelope, score)))
            .collect())
    }

    /// Up to `limit` ready envelopes in dispatch order
    pub async fn queued(&self, limit: usize) -> Result<Vec<Envelope>> {
        let Some(stop) = last_index(limit) else {
            return Ok(Vec::new());
        };
        let members = self.store.lrange(self.keys.queued(), 0, stop).await?;
        Ok(members.iter().filter_map(|member| self.decode(member)).collect())
    }

    /// Get queue statistics
    pub async fn stats(&self) -> Result<QueueStats> {
        Ok(QueueStats {
            name: self.keys.name().to_string(),
            delayed: self.store.zcard(self.keys.delayed()).await?,
            queued: self.store.llen(self.keys.queued()).await?,
            in_flight: 0,
        })
    }

    fn decode(&self, member: &str) -> Option<Envelope> {
        match Envelope::decode(member) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!("Skipping undecodable entry in queue {}: {}", self.keys.name(), e);
                None
            }
        }
    }
}

fn last_index(limit: usize) -> Option<i64> {
    match limit {
        0 => None,
        n => Some(i64::try_from(n - 1).unwrap_or(i64::MAX)),
    }
}

/// Queue statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Queue name
    pub name: String,
    /// Entries in the delayed collection
    pub delayed: u64,
    /// Entries in the ready list
    pub queued: u64,
    /// Running handler invocations, always 0 from a plain [`Inspector`]
    pub in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store that counts `close` calls
    #[derive(Default)]
    struct CloseCounting {
        inner: InMemoryStore,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl Store for CloseCounting {
        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }
        async fn zadd_nx(&self, key: &str, member: &str, score: i64) -> Result<bool> {
            self.inner.zadd_nx(key, member, score).await
        }
        async fn zrange_with_scores(&self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, i64)>> {
            self.inner.zrange_with_scores(key, start, stop).await
        }
        async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
            self.inner.zrem(key, member).await
        }
        async fn zcard(&self, key: &str) -> Result<u64> {
            self.inner.zcard(key).await
        }
        async fn rpush(&self, key: &str, member: &str) -> Result<u64> {
            self.inner.rpush(key, member).await
        }
        async fn lpop(&self, key: &str) -> Result<Option<String>> {
            self.inner.lpop(key).await
        }
        async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
            self.inner.lrange(key, start, stop).await
        }
        async fn llen(&self, key: &str) -> Result<u64> {
            self.inner.llen(key).await
        }
        async fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn inspector_over(store: Arc<InMemoryStore>) -> Inspector {
        Inspector::new(store, QueueKeys::new("jobs").unwrap())
    }

    #[test]
    fn test_last_index() {
        assert_eq!(last_index(0), None);
        assert_eq!(last_index(1), Some(0));
        assert_eq!(last_index(10), Some(9));
    }

    #[tokio::test]
    async fn test_producer_push_dedups() {
        let store = Arc::new(InMemoryStore::new());
        let producer = Producer::new(store.clone(), QueueKeys::new("jobs").unwrap());

        let envelope = Envelope::new(42, json!({"to": "a@example.com"}));
        producer.push(&envelope).await.unwrap();
        producer.push(&envelope).await.unwrap();
        producer.push(&Envelope::new(42, json!({"to": "b@example.com"}))).await.unwrap();

        assert_eq!(producer.delayed_len().await.unwrap(), 2);
        assert_eq!(producer.queued_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inspector_delayed_and_queued() {
        let store = Arc::new(InMemoryStore::new());
        let later = Envelope::new(20, json!("later"));
        let sooner = Envelope::new(10, json!("sooner"));
        store.zadd_nx("jobs:delayed", &later.encode().unwrap(), 20).await.unwrap();
        store.zadd_nx("jobs:delayed", &sooner.encode().unwrap(), 10).await.unwrap();
        store.rpush("jobs:queued", &Envelope::new(1, json!("ready")).encode().unwrap()).await.unwrap();

        let inspector = inspector_over(store);
        let delayed = inspector.delayed(10).await.unwrap();
        assert_eq!(delayed, vec![(sooner.clone(), 10), (later, 20)]);
        assert_eq!(inspector.delayed(1).await.unwrap(), vec![(sooner, 10)]);
        assert!(inspector.delayed(0).await.unwrap().is_empty());

        let queued = inspector.queued(10).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].payload, json!("ready"));
    }

    #[tokio::test]
    async fn test_inspector_skips_undecodable() {
        let store = Arc::new(InMemoryStore::new());
        store.rpush("jobs:queued", "not json").await.unwrap();
        store.rpush("jobs:queued", &Envelope::new(1, json!(1)).encode().unwrap()).await.unwrap();

        let queued = inspector_over(store).queued(10).await.unwrap();
        assert_eq!(queued, vec![Envelope::new(1, json!(1))]);
    }

    #[tokio::test]
    async fn test_inspector_lists_negative_retry_count() {
        let store = Arc::new(InMemoryStore::new());
        store
            .zadd_nx("jobs:delayed", r#"{"retry_count":-1,"score":9999999999,"msg":"x"}"#, 9_999_999_999)
            .await
            .unwrap();

        let inspector = inspector_over(store);
        let delayed = inspector.delayed(10).await.unwrap();
        assert_eq!(delayed.len() as u64, inspector.stats().await.unwrap().delayed);
        assert_eq!(delayed[0].0.retry_count, -1);
        assert_eq!(delayed[0].1, 9_999_999_999);
    }

    #[tokio::test]
    async fn test_shutdown_leaves_caller_store_open() {
        let store = Arc::new(CloseCounting::default());
        let queue = QueueBuilder::new()
            .queue_name("jobs")
            .build_with_store(store.clone(), crate::handler_fn(|_message: String| async {}))
            .await
            .unwrap();

        queue.shutdown().await.unwrap();
        assert_eq!(store.closed.load(Ordering::SeqCst), 0);

        // The caller can still use its store, and close it explicitly
        queue.push(&Envelope::new(i64::MAX, json!("kept"))).await.unwrap();
        assert_eq!(queue.delayed_len().await.unwrap(), 1);
        Producer::new(store.clone(), queue.keys().clone()).close().await.unwrap();
        assert_eq!(store.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inspector_stats() {
        let store = Arc::new(InMemoryStore::new());
        store.zadd_nx("jobs:delayed", "a", 1).await.unwrap();
        store.rpush("jobs:queued", "b").await.unwrap();
        store.rpush("jobs:queued", "c").await.unwrap();

        let stats = inspector_over(store).stats().await.unwrap();
        assert_eq!(
            stats,
            QueueStats {
                name: "jobs".to_string(),
                delayed: 1,
                queued: 2,
                in_flight: 0,
            }
        );
    }
}
