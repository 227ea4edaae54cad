//! Statistics command handler
//!
//! Provides the command displaying queue sizes.

use color_eyre::Result;
use delayq::Producer;

/// Show statistics for the configured queue
pub async fn show(producer: &Producer) -> Result<()> {
    println!("Statistics");
    let stats = producer.inspector().stats().await?;

    println!("  Queue: {}", stats.name);
    println!("  Delayed: {}", stats.delayed);
    println!("  Queued: {}", stats.queued);

    Ok(())
}
