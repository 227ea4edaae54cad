//! In-memory store
//!
//! Process-local implementation of [`Store`] with Redis sorted-set and list
//! semantics. Used for tests and local development; nothing is persisted.

use super::store::{read_error, write_error, Store};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct SortedSet {
    /// Ordered by score, then member bytes (Redis tie-break)
    entries: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

#[derive(Default)]
struct State {
    sorted_sets: HashMap<String, SortedSet>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-memory store
///
/// # Example
///
/// ```rust
/// use delayq::storage::{InMemoryStore, Store};
///
/// # async fn example() -> delayq::Result<()> {
/// let store = InMemoryStore::new();
/// store.zadd_nx("jobs:delayed", "payload", 10).await?;
/// assert_eq!(store.zcard("jobs:delayed").await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unreachable: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command fail as if the server were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn lock(&self, on_error: fn(String) -> Error) -> Result<MutexGuard<'_, State>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(on_error("connection refused".into()));
        }
        self.state.lock().map_err(|_| on_error("state lock poisoned".into()))
    }

    fn read(&self) -> Result<MutexGuard<'_, State>> {
        self.lock(read_error)
    }

    fn write(&self) -> Result<MutexGuard<'_, State>> {
        self.lock(write_error)
    }
}

/// Resolve a Redis-style inclusive index range (negative counts from the end)
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        self.read().map(|_| ())
    }

    async fn zadd_nx(&self, key: &str, member: &str, score: i64) -> Result<bool> {
        let mut state = self.write()?;
        let set = state.sorted_sets.entry(key.to_string()).or_default();
        if set.scores.contains_key(member) {
            return Ok(false);
        }
        set.scores.insert(member.to_string(), score);
        set.entries.insert((score, member.to_string()));
        Ok(true)
    }

    async fn zrange_with_scores(&self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, i64)>> {
        let state = self.read()?;
        let Some(set) = state.sorted_sets.get(key) else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = resolve_range(set.entries.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(set
            .entries
            .iter()
            .skip(start)
            .take(stop - start + 1)
            .map(|(score, member)| (member.clone(), *score))
            .collect())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let mut state = self.write()?;
        let Some(set) = state.sorted_sets.get_mut(key) else {
            return Ok(false);
        };
        match set.scores.remove(member) {
            Some(score) => {
                set.entries.remove(&(score, member.to_string()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let state = self.read()?;
        Ok(state.sorted_sets.get(key).map_or(0, |set| set.entries.len() as u64))
    }

    async fn rpush(&self, key: &str, member: &str) -> Result<u64> {
        let mut state = self.write()?;
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_back(member.to_string());
        Ok(list.len() as u64)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.write()?;
        Ok(state.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let state = self.read()?;
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = resolve_range(list.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(list.range(start..=stop).cloned().collect())
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let state = self.read()?;
        Ok(state.lists.get(key).map_or(0, |list| list.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Promotion, QueueKeys};

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, 0, -1), Some((0, 4)));
        assert_eq!(resolve_range(5, 0, 0), Some((0, 0)));
        assert_eq!(resolve_range(5, 1, 100), Some((1, 4)));
        assert_eq!(resolve_range(5, -2, -1), Some((3, 4)));
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(5, 6, 10), None);
    }

    #[tokio::test]
    async fn test_zadd_nx_keeps_first_score() {
        let store = InMemoryStore::new();
        assert!(store.zadd_nx("z", "a", 10).await.unwrap());
        assert!(!store.zadd_nx("z", "a", 1).await.unwrap());

        let head = store.zrange_with_scores("z", 0, 0).await.unwrap();
        assert_eq!(head, vec![("a".to_string(), 10)]);
    }

    #[tokio::test]
    async fn test_zrange_orders_by_score_then_member() {
        let store = InMemoryStore::new();
        store.zadd_nx("z", "c", 5).await.unwrap();
        store.zadd_nx("z", "b", 5).await.unwrap();
        store.zadd_nx("z", "a", 9).await.unwrap();

        let all = store.zrange_with_scores("z", 0, -1).await.unwrap();
        let members: Vec<&str> = all.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_list_is_fifo() {
        let store = InMemoryStore::new();
        store.rpush("l", "1").await.unwrap();
        store.rpush("l", "2").await.unwrap();
        assert_eq!(store.llen("l").await.unwrap(), 2);
        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec!["1", "2"]);
        assert_eq!(store.lpop("l").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.lpop("l").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.lpop("l").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store = InMemoryStore::new();
        store.set_unreachable(true);
        assert!(store.ping().await.is_err());
        assert!(matches!(store.rpush("l", "1").await, Err(Error::StoreWrite(_))));
        assert!(matches!(store.llen("l").await, Err(Error::StoreRead(_))));

        store.set_unreachable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_default_promotion() {
        let store = InMemoryStore::new();
        let keys = QueueKeys::new("q").unwrap();

        assert_eq!(store.promote_due(&keys, 100).await.unwrap(), Promotion::Empty);

        store.zadd_nx(keys.delayed(), "later", 200).await.unwrap();
        store.zadd_nx(keys.delayed(), "now", 50).await.unwrap();

        let first = store.promote_due(&keys, 100).await.unwrap();
        assert_eq!(first, Promotion::Promoted { member: "now".into(), score: 50 });
        assert_eq!(store.promote_due(&keys, 100).await.unwrap(), Promotion::NotDue { score: 200 });

        assert_eq!(store.lrange(keys.queued(), 0, -1).await.unwrap(), vec!["now"]);
        assert_eq!(store.zcard(keys.delayed()).await.unwrap(), 1);
    }
}
