//! Queue construction tests
//!
//! Construction either returns a running queue or an error with nothing
//! started.

mod common;

use common::RecordingHandler;
use delayq::storage::{InMemoryStore, Store};
use delayq::{Error, QueueBuilder, QueueConfig};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_empty_name_is_invalid_key() {
    let store = Arc::new(InMemoryStore::new());
    let result = QueueBuilder::new()
        .queue_name("")
        .build_with_store(store, RecordingHandler::new())
        .await;
    assert!(matches!(result, Err(Error::InvalidKey)));
}

#[tokio::test]
async fn test_unreachable_store_starts_nothing() {
    let store = Arc::new(InMemoryStore::new());
    store.set_unreachable(true);
    let handler = RecordingHandler::new();

    let result = QueueBuilder::new()
        .queue_name("unreachable")
        .poll_interval(Duration::from_millis(5))
        .build_with_store(store.clone(), handler.clone())
        .await;
    assert!(matches!(result, Err(Error::StoreUnreachable(_))));

    // Nothing promotes once the store comes back
    store.set_unreachable(false);
    store.zadd_nx("unreachable:delayed", "{}", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.zcard("unreachable:delayed").await.unwrap(), 1);
    assert_eq!(handler.count(), 0);
}

#[tokio::test]
async fn test_unreachable_redis_address() {
    // Nothing listens on port 1
    let result = QueueBuilder::new()
        .addresses(["127.0.0.1:1"])
        .queue_name("nowhere")
        .connect_timeout(Duration::from_millis(500))
        .build(RecordingHandler::new())
        .await;
    assert!(matches!(result, Err(Error::StoreUnreachable(_))));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let result = QueueBuilder::new()
        .queue_name("bad-config")
        .poll_interval(Duration::ZERO)
        .build_with_store(store, RecordingHandler::new())
        .await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_builder_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"queue_name": "from-file", "rate_limit": 120, "poll_interval_ms": 5, "max_in_flight": 2}}"#
    )
    .unwrap();

    let config = QueueConfig::from_json_file(file.path()).unwrap();
    let store = Arc::new(InMemoryStore::new());
    let queue = QueueBuilder::from_config(config)
        .build_with_store(store, RecordingHandler::new())
        .await
        .unwrap();

    assert_eq!(queue.name(), "from-file");
    assert_eq!(queue.keys().delayed(), "from-file:delayed");
    assert_eq!(queue.keys().queued(), "from-file:queued");
    queue.shutdown().await.unwrap();
}
