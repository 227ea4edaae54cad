//! Common test utilities
//!
//! Shared helper functions and fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use delayq::storage::InMemoryStore;
use delayq::{Envelope, Handler, Queue, QueueBuilder};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handler that records every message it receives
#[derive(Clone, Default)]
pub struct RecordingHandler {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw messages in arrival order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Decoded payloads in arrival order
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.messages()
            .iter()
            .map(|m| Envelope::decode(m).expect("handler got an undecodable message").payload)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, message: String) {
        self.messages.lock().unwrap().push(message);
    }
}

/// Redis URL for integration tests
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Queue name unique to one test run
pub fn unique_queue(test_name: &str) -> String {
    format!("test-{}-{}", test_name, uuid::Uuid::new_v4())
}

/// Builder tuned for fast in-memory tests
pub fn fast_builder(queue_name: &str) -> QueueBuilder {
    QueueBuilder::new()
        .queue_name(queue_name)
        .rate_limit(1000)
        .rate_limit_period(Duration::from_secs(1))
        .poll_interval(Duration::from_millis(5))
        .error_backoff(Duration::from_millis(10))
}

/// Start a queue over a fresh in-memory store
pub async fn memory_queue(builder: QueueBuilder) -> (Queue, Arc<InMemoryStore>, RecordingHandler) {
    let store = Arc::new(InMemoryStore::new());
    let handler = RecordingHandler::new();
    let queue = builder
        .build_with_store(store.clone(), handler.clone())
        .await
        .expect("Failed to build queue");
    (queue, store, handler)
}

/// Envelope due now with a JSON payload
pub fn due(payload: serde_json::Value) -> Envelope {
    Envelope::new(0, payload)
}

/// Wait for a condition to be true
///
/// # Returns
/// Ok(()) if condition was met, Err if timeout occurred
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let check_interval = Duration::from_millis(10);

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(check_interval).await;
    }

    Err(format!("Condition not met after {:?}", timeout).into())
}

/// Wait for an async condition to be true
pub async fn wait_for_async<F, Fut>(mut condition: F, timeout: Duration) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    Err(format!("Condition not met after {:?}", timeout).into())
}
