//! # delayq
//!
//! delayq is a delayed, rate-limited message queue backed by Redis.
//!
//! ## Features
//!
//! - Delayed delivery: envelopes wait in a sorted set until their score
//!   (unix seconds) is reached, then move to a FIFO ready list
//! - Deduplication of identical envelopes while they wait
//! - Dispatch bounded to a configurable number of messages per period
//! - Optional cap on concurrently running handlers
//! - Standalone and cluster Redis, plus an in-memory store for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delayq::{handler_fn, Envelope, QueueBuilder};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = QueueBuilder::new()
//!         .addresses(["localhost:6379"])
//!         .queue_name("emails")
//!         .rate_limit(600)
//!         .build(handler_fn(|message: String| async move {
//!             if let Ok(envelope) = Envelope::decode(&message) {
//!                 println!("sending {}", envelope.payload);
//!             }
//!         }))
//!         .await?;
//!
//!     let envelope = Envelope::builder()
//!         .payload(&serde_json::json!({"to": "user@example.com"}))?
//!         .delay(Duration::from_secs(30))
//!         .build();
//!     queue.push(&envelope).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     queue.shutdown().await?;
//!     queue.wait().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Public module exports
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;

// Client SDK
pub mod client;

// Background tasks
pub mod server;

// Processor
pub mod processor;

// Storage layer
pub mod storage;

// Re-export common types
pub use client::{Inspector, Producer, Queue, QueueBuilder, QueueStats};
pub use config::QueueConfig;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use processor::{handler_fn, Handler};
