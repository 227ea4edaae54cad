//! Redis Key manager
//!
//! Derives the store keys of a logical queue, so several queues can share
//! one store without colliding.

use crate::{Error, Result};
use std::fmt;

/// Role of a key within a queue namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Sorted set of envelopes waiting for their score to elapse
    Delayed,
    /// List of due envelopes waiting for dispatch
    Queued,
}

impl KeyRole {
    /// Key suffix for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Delayed => "delayed",
            KeyRole::Queued => "queued",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `<queue_name>:<role>`
pub fn derive_key(queue_name: &str, role: KeyRole) -> String {
    format!("{}:{}", queue_name, role)
}

/// Store keys of one logical queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    name: String,
    delayed: String,
    queued: String,
}

impl QueueKeys {
    /// Create the key pair for a queue
    ///
    /// Fails with [`Error::InvalidKey`] when the name is empty.
    pub fn new(queue_name: impl Into<String>) -> Result<Self> {
        let name = queue_name.into();
        if name.is_empty() {
            return Err(Error::InvalidKey);
        }

        Ok(Self {
            delayed: derive_key(&name, KeyRole::Delayed),
            queued: derive_key(&name, KeyRole::Queued),
            name,
        })
    }

    /// Logical queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delayed collection key (ZSet)
    /// Example: orders:delayed
    pub fn delayed(&self) -> &str {
        &self.delayed
    }

    /// Ready list key (List)
    /// Example: orders:queued
    pub fn queued(&self) -> &str {
        &self.queued
    }

    /// Whether both keys land in the same Redis Cluster slot.
    ///
    /// Redis only hashes the part between the first `{` and the next `}`
    /// when that part is non-empty.
    pub fn shares_hash_slot(&self) -> bool {
        let Some(open) = self.name.find('{') else {
            return false;
        };
        match self.name[open + 1..].find('}') {
            Some(len) => len > 0,
            None => false,
        }
    }
}
