//! Push command handler

use color_eyre::Result;
use delayq::{Envelope, Producer};
use std::time::Duration;

/// Build the envelope described by the push arguments
///
/// With neither `delay` nor `at` the message is due immediately.
pub fn build_envelope(payload: &str, delay: Option<u64>, at: Option<i64>, retry_count: i64) -> Result<Envelope> {
    let value = serde_json::from_str(payload).unwrap_or_else(|_| serde_json::Value::String(payload.to_string()));

    let mut builder = Envelope::builder().raw_payload(value).retry_count(retry_count);
    if let Some(secs) = delay {
        builder = builder.delay(Duration::from_secs(secs));
    }
    if let Some(score) = at {
        builder = builder.at(score);
    }
    Ok(builder.build())
}

/// Push one envelope and report the resulting queue size
pub async fn run(producer: &Producer, envelope: &Envelope) -> Result<()> {
    producer.push(envelope).await?;

    println!("Pushed to '{}' with score {}", producer.keys().name(), envelope.score);
    println!("  Delayed: {}", producer.delayed_len().await?);

    Ok(())
}
