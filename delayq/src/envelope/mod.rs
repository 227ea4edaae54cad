//! Message envelope
//!
//! The unit stored in both collections. Its serialized form doubles as its
//! identity in the delayed set, so two envelopes with the same retry count,
//! score and payload are stored once.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod builder;

pub use builder::EnvelopeBuilder;

/// Message envelope
///
/// Wire format: `{"retry_count":0,"score":1700000000,"msg":...}`, compact,
/// fields in this order. Object keys inside `msg` are emitted sorted, so the
/// encoding is canonical.
///
/// `<`, `>` and `&` inside strings are written as-is. Producers that escape
/// them (Go's `encoding/json` writes `\u003c`) encode the same payload as a
/// different member, so their pushes do not dedup against this crate's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Retry bookkeeping, left to handlers and producers. Signed, as other
    /// producers may write any integer.
    pub retry_count: i64,
    /// Readiness time (unix seconds) or plain priority, lower first
    pub score: i64,
    /// Opaque payload
    #[serde(rename = "msg")]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Create an envelope from an already-built payload value
    pub fn new(score: i64, payload: serde_json::Value) -> Self {
        Self {
            retry_count: 0,
            score,
            payload,
        }
    }

    /// Start building an envelope
    #[must_use]
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new()
    }

    /// Encode to the canonical wire string
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode a wire string, as handed to handlers
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize the payload into a concrete type
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| Error::Serialization(e.to_string()))
    }
}
