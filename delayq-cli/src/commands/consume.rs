//! Consume command handler
//!
//! Runs a queue whose handler logs every message, until Ctrl-C.

use color_eyre::Result;
use delayq::{handler_fn, Envelope, QueueBuilder, QueueConfig};

/// Consume until interrupted, then stop and drain
pub async fn run(config: QueueConfig) -> Result<()> {
    let queue = QueueBuilder::from_config(config)
        .build(handler_fn(|message: String| async move {
            match Envelope::decode(&message) {
                Ok(envelope) => tracing::info!(
                    score = envelope.score,
                    retry_count = envelope.retry_count,
                    "Received {}",
                    envelope.payload
                ),
                Err(e) => tracing::warn!("Received undecodable message {:?}: {}", message, e),
            }
        }))
        .await?;

    println!("Consuming '{}', press Ctrl-C to stop", queue.name());
    tokio::signal::ctrl_c().await?;

    queue.shutdown().await?;
    queue.wait().await;
    println!("Stopped");

    Ok(())
}
