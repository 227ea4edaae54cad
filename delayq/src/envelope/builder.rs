//! Envelope builder
//!
//! Provides fluent API for building envelopes.

use super::Envelope;
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

/// Envelope builder
///
/// # Examples
///
/// ```rust
/// use delayq::Envelope;
/// use serde::Serialize;
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct EmailPayload {
///     to: String,
///     subject: String,
/// }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let envelope = Envelope::builder()
///     .payload(&EmailPayload {
///         to: "user@example.com".to_string(),
///         subject: "Hello".to_string(),
///     })?
///     .delay(Duration::from_secs(60))
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    retry_count: i64,
    score: Option<i64>,
    payload: serde_json::Value,
}

impl EnvelopeBuilder {
    /// Create a new envelope builder
    ///
    /// Without a score or delay the envelope is due immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload (serialized to JSON)
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = serde_json::to_value(payload)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self)
    }

    /// Set an already-built JSON payload
    #[must_use]
    pub fn raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the score directly (unix seconds, or a plain priority)
    #[must_use]
    pub fn score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    /// Become due at a unix timestamp
    #[must_use]
    pub fn at(self, timestamp: i64) -> Self {
        self.score(timestamp)
    }

    /// Become due `delay` from now (second resolution)
    #[must_use]
    pub fn delay(self, delay: Duration) -> Self {
        let secs = i64::try_from(delay.as_secs()).unwrap_or(i64::MAX);
        self.score(Utc::now().timestamp().saturating_add(secs))
    }

    /// Set the retry count
    #[must_use]
    pub fn retry_count(mut self, retry_count: i64) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Build the envelope
    pub fn build(self) -> Envelope {
        Envelope {
            retry_count: self.retry_count,
            score: self.score.unwrap_or_else(|| Utc::now().timestamp()),
            payload: self.payload,
        }
    }
}
