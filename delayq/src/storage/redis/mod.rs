//! Redis client wrapper
//!
//! Implements [`Store`] over a `fred` connection pool, in standalone or
//! cluster mode.

use super::keys::QueueKeys;
use super::store::{promote_with_compensation, read_error, write_error, Promotion, Store};
use crate::{Error, Result};
use async_trait::async_trait;
use fred::{
    interfaces::*,
    prelude::*,
    types::{RedisConfig as FredRedisConfig, ReconnectPolicy, SetOptions},
};
use serde::Deserialize;
use std::sync::Arc;

/// Atomic promotion: read the head, and if due, move it to the ready list.
///
/// KEYS[1] delayed set, KEYS[2] ready list, ARGV[1] current unix time.
/// Returns `{}` when empty, otherwise `{state, member, score}`.
const PROMOTE_SCRIPT: &str = r#"
local head = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
if #head == 0 then
    return {}
end
local member, score = head[1], head[2]
if tonumber(score) > tonumber(ARGV[1]) then
    return {'pending', member, score}
end
redis.call('ZREM', KEYS[1], member)
redis.call('RPUSH', KEYS[2], member)
return {'promoted', member, score}
"#;

/// Redis connection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// Single server, first address is used
    #[default]
    Standalone,
    /// Redis Cluster, every address seeds discovery
    Cluster,
}

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Endpoint addresses, `host:port` or `redis://` URLs
    pub addresses: Vec<String>,
    /// Connection mode
    pub mode: RedisMode,
    /// Connection pool size
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["localhost:6379".to_string()],
            mode: RedisMode::Standalone,
            pool_size: 10,
        }
    }
}

impl RedisConfig {
    /// Connection URL understood by `fred`
    pub fn connection_url(&self) -> Result<String> {
        let hosts: Vec<&str> = self
            .addresses
            .iter()
            .map(|a| strip_scheme(a.trim()))
            .filter(|a| !a.is_empty())
            .collect();

        let Some((first, rest)) = hosts.split_first() else {
            return Err(Error::Config("at least one store address is required".into()));
        };

        match self.mode {
            RedisMode::Standalone => {
                if !rest.is_empty() {
                    tracing::warn!("Standalone mode uses only the first address ({}), {} ignored", first, rest.len());
                }
                Ok(format!("redis://{}", first))
            }
            RedisMode::Cluster => {
                let nodes: Vec<String> = rest.iter().map(|n| format!("node={}", n)).collect();
                if nodes.is_empty() {
                    Ok(format!("redis-cluster://{}", first))
                } else {
                    Ok(format!("redis-cluster://{}?{}", first, nodes.join("&")))
                }
            }
        }
    }
}

fn strip_scheme(address: &str) -> &str {
    ["redis-cluster://", "redis://"]
        .iter()
        .find_map(|scheme| address.strip_prefix(scheme))
        .unwrap_or(address)
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    pool: Arc<RedisPool>,
    mode: RedisMode,
}

impl RedisStore {
    /// Create the pool and connect it
    ///
    /// Does not probe liveness; callers follow up with [`Store::ping`].
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let redis_config = FredRedisConfig::from_url(&url)?;
        let pool = RedisPool::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::default()),
            config.pool_size.max(1),
        )?;

        pool.init().await?;

        Ok(Self {
            pool: Arc::new(pool),
            mode: config.mode,
        })
    }

    /// Create a standalone store from a connection URL
    pub async fn from_url(url: impl Into<String>) -> Result<Self> {
        let config = RedisConfig {
            addresses: vec![url.into()],
            ..RedisConfig::default()
        };
        Self::connect(&config).await
    }

    /// Get the underlying Redis connection pool
    pub fn pool(&self) -> &Arc<RedisPool> {
        &self.pool
    }

    /// Whether the promotion script can run for these keys
    fn can_script(&self, keys: &QueueKeys) -> bool {
        match self.mode {
            RedisMode::Standalone => true,
            RedisMode::Cluster => keys.shares_hash_slot(),
        }
    }

    async fn promote_script(&self, keys: &QueueKeys, now: i64) -> Result<Promotion> {
        let script_keys: Vec<RedisKey> = vec![keys.delayed().into(), keys.queued().into()];
        let reply: Vec<String> = self
            .pool
            .eval(PROMOTE_SCRIPT, script_keys, vec![RedisValue::Integer(now)])
            .await
            .map_err(write_error)?;

        parse_promotion(reply)
    }
}

/// Decode the promotion script reply
fn parse_promotion(reply: Vec<String>) -> Result<Promotion> {
    let mut parts = reply.into_iter();
    let (Some(state), Some(member), Some(score)) = (parts.next(), parts.next(), parts.next()) else {
        return Ok(Promotion::Empty);
    };
    let score = parse_score(&score)?;

    match state.as_str() {
        "promoted" => Ok(Promotion::Promoted { member, score }),
        "pending" => Ok(Promotion::NotDue { score }),
        other => Err(read_error(format!("unexpected promotion reply: {}", other))),
    }
}

/// Redis keeps scores as doubles; scores beyond 2^53 lose precision
fn parse_score(raw: &str) -> Result<i64> {
    raw.parse::<f64>()
        .map(|s| s as i64)
        .map_err(|e| read_error(format!("invalid score {:?}: {}", raw, e)))
}

#[async_trait]
impl Store for RedisStore {
    async fn ping(&self) -> Result<()> {
        let _: String = self.pool.ping().await.map_err(read_error)?;
        Ok(())
    }

    async fn zadd_nx(&self, key: &str, member: &str, score: i64) -> Result<bool> {
        let values: Vec<(f64, RedisValue)> = vec![(score as f64, member.into())];
        let added: u64 = self
            .pool
            .zadd(key, Some(SetOptions::NX), None, false, false, values)
            .await
            .map_err(write_error)?;
        Ok(added > 0)
    }

    async fn zrange_with_scores(&self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, i64)>> {
        let result: Vec<RedisValue> = self
            .pool
            .zrange(key, start, stop, None, false, None, true)
            .await
            .map_err(read_error)?;
        // Result comes as alternating member, score, member, score, ...
        let mut output = Vec::with_capacity(result.len() / 2);
        for chunk in result.chunks(2) {
            if let [member, score] = chunk {
                let member = member.as_string();
                let score = score.as_f64();
                if let (Some(m), Some(s)) = (member, score) {
                    output.push((m, s as i64));
                }
            }
        }
        Ok(output)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let removed: u64 = self.pool.zrem(key, member).await.map_err(write_error)?;
        Ok(removed > 0)
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        self.pool.zcard(key).await.map_err(read_error)
    }

    async fn rpush(&self, key: &str, member: &str) -> Result<u64> {
        self.pool.rpush(key, member).await.map_err(write_error)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        self.pool.lpop(key, None).await.map_err(write_error)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.pool.lrange(key, start, stop).await.map_err(read_error)
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        self.pool.llen(key).await.map_err(read_error)
    }

    async fn promote_due(&self, keys: &QueueKeys, now: i64) -> Result<Promotion> {
        if self.can_script(keys) {
            self.promote_script(keys, now).await
        } else {
            promote_with_compensation(self, keys, now).await
        }
    }

    async fn close(&self) -> Result<()> {
        self.pool.quit().await.map_err(write_error)
    }
}
