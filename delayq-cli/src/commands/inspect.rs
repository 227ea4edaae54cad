//! Inspect command handler

use color_eyre::Result;
use delayq::Producer;

/// List the heads of the delayed collection and the ready list
pub async fn show(producer: &Producer, limit: usize) -> Result<()> {
    let inspector = producer.inspector();
    let name = producer.keys().name();

    println!("Delayed messages in '{}' (showing max {}):", name, limit);
    let delayed = inspector.delayed(limit).await?;
    if delayed.is_empty() {
        println!("  (No delayed messages)");
    }
    for (envelope, score) in delayed {
        println!("  - [{}] retry {} {}", score, envelope.retry_count, envelope.payload);
    }

    println!("Ready messages in '{}' (showing max {}):", name, limit);
    let queued = inspector.queued(limit).await?;
    if queued.is_empty() {
        println!("  (No ready messages)");
    }
    for envelope in queued {
        println!("  - [{}] retry {} {}", envelope.score, envelope.retry_count, envelope.payload);
    }

    Ok(())
}
