//! Ordered store contract
//!
//! The queue only talks to its backing store through [`Store`]: a sorted
//! collection keyed by score plus a FIFO list. Every method maps to a single
//! atomic store command; no multi-command transactions are assumed.

use super::keys::QueueKeys;
use crate::{Error, Result};
use async_trait::async_trait;

/// Outcome of one promotion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The delayed collection is empty
    Empty,
    /// The lowest-score entry is not due yet
    NotDue {
        /// Score of the head entry
        score: i64,
    },
    /// The head entry was moved to the tail of the ready list
    Promoted {
        /// Serialized envelope
        member: String,
        /// Score it was stored under
        score: i64,
    },
}

/// Ordered key-value store used by the queue
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Liveness probe
    async fn ping(&self) -> Result<()>;

    /// Sorted Set: add the member at `score` unless it already exists.
    ///
    /// Returns `true` when the member was added.
    async fn zadd_nx(&self, key: &str, member: &str, score: i64) -> Result<bool>;

    /// Sorted Set: members with scores by rank, lowest score first (inclusive)
    async fn zrange_with_scores(&self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, i64)>>;

    /// Sorted Set: remove a member, returns whether it was present
    async fn zrem(&self, key: &str, member: &str) -> Result<bool>;

    /// Sorted Set: cardinality
    async fn zcard(&self, key: &str) -> Result<u64>;

    /// List: push to the tail, returns the new length
    async fn rpush(&self, key: &str, member: &str) -> Result<u64>;

    /// List: pop the head
    async fn lpop(&self, key: &str) -> Result<Option<String>>;

    /// List: elements by index range (inclusive)
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;

    /// List: length
    async fn llen(&self, key: &str) -> Result<u64>;

    /// Move the lowest-score delayed entry to the ready list if `score <= now`.
    ///
    /// The default runs the separate commands with compensation, see
    /// [`promote_with_compensation`]. Stores that can run the move atomically
    /// override it.
    async fn promote_due(&self, keys: &QueueKeys, now: i64) -> Result<Promotion> {
        promote_with_compensation(self, keys, now).await
    }

    /// Release connections held by the store
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Remove-then-push promotion built from single commands.
///
/// If the ready push fails the entry is re-added to the delayed collection at
/// its original score and the push error is returned. A crash between the
/// remove and the push loses the entry.
pub async fn promote_with_compensation<S>(store: &S, keys: &QueueKeys, now: i64) -> Result<Promotion>
where
    S: Store + ?Sized,
{
    let head = store.zrange_with_scores(keys.delayed(), 0, 0).await?;
    let Some((member, score)) = head.into_iter().next() else {
        return Ok(Promotion::Empty);
    };

    if score > now {
        return Ok(Promotion::NotDue { score });
    }

    if !store.zrem(keys.delayed(), &member).await? {
        // Someone else promoted it between the read and the remove
        return Ok(Promotion::Empty);
    }

    if let Err(push_err) = store.rpush(keys.queued(), &member).await {
        match store.zadd_nx(keys.delayed(), &member, score).await {
            Ok(_) => tracing::warn!(
                "Ready push failed for queue {}, entry restored to delayed set: {}",
                keys.name(),
                push_err
            ),
            Err(restore_err) => tracing::error!(
                "Ready push failed for queue {} and restore failed, entry lost: {} / {}",
                keys.name(),
                push_err,
                restore_err
            ),
        }
        return Err(push_err);
    }

    Ok(Promotion::Promoted { member, score })
}

/// Map a store read failure
pub(crate) fn read_error(e: impl std::fmt::Display) -> Error {
    Error::StoreRead(e.to_string())
}

/// Map a store write failure
pub(crate) fn write_error(e: impl std::fmt::Display) -> Error {
    Error::StoreWrite(e.to_string())
}
