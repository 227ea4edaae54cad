//! Queue configuration
//!
//! Provides the options a queue client is constructed from, with defaults
//! and JSON file loading. Durations are given in milliseconds in JSON.

use crate::logging::LogOptions;
use crate::storage::{RedisConfig, RedisMode};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Permits per period used when the configured rate limit is not positive
pub const DEFAULT_RATE_LIMIT: u32 = 1000;

/// Default rate limit period
pub const DEFAULT_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(60);

/// Queue configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Store endpoint addresses
    pub addresses: Vec<String>,

    /// Redis connection mode
    pub redis_mode: RedisMode,

    /// Connection pool size
    pub pool_size: usize,

    /// Logical queue name, must not be empty
    pub queue_name: String,

    /// Permits per period; non-positive means [`DEFAULT_RATE_LIMIT`]
    pub rate_limit: i64,

    /// Period the rate limit applies to
    #[serde(rename = "rate_limit_period_ms", deserialize_with = "millis")]
    pub rate_limit_period: Duration,

    /// Promoter idle between polls when nothing is due
    #[serde(rename = "poll_interval_ms", deserialize_with = "millis")]
    pub poll_interval: Duration,

    /// Idle after a store error in a background loop
    #[serde(rename = "error_backoff_ms", deserialize_with = "millis")]
    pub error_backoff: Duration,

    /// Deadline for connecting and answering the liveness probe
    #[serde(rename = "connect_timeout_ms", deserialize_with = "millis")]
    pub connect_timeout: Duration,

    /// Cap on concurrently running handlers, unbounded when unset
    pub max_in_flight: Option<usize>,

    /// Log sink options, used by [`crate::logging::init_logging`]
    pub log: Option<LogOptions>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["localhost:6379".to_string()],
            redis_mode: RedisMode::Standalone,
            pool_size: 10,
            queue_name: "default".to_string(),
            rate_limit: DEFAULT_RATE_LIMIT as i64,
            rate_limit_period: DEFAULT_RATE_LIMIT_PERIOD,
            poll_interval: Duration::from_millis(50),
            error_backoff: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(5),
            max_in_flight: None,
            log: None,
        }
    }
}

impl QueueConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::Config("invalid config file path".into()));
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    /// Parse configuration from a JSON document
    pub fn from_json_str(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set store addresses
    #[must_use]
    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Set the queue name
    #[must_use]
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Set the rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, limit: i64) -> Self {
        self.rate_limit = limit;
        self
    }

    /// Set the rate limit period
    #[must_use]
    pub fn with_rate_limit_period(mut self, period: Duration) -> Self {
        self.rate_limit_period = period;
        self
    }

    /// Set the promoter poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the idle after background store errors
    #[must_use]
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Set the connect deadline
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Cap concurrently running handlers
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Rate limit with the non-positive default applied
    pub fn effective_rate_limit(&self) -> u32 {
        if self.rate_limit <= 0 {
            DEFAULT_RATE_LIMIT
        } else {
            u32::try_from(self.rate_limit).unwrap_or(u32::MAX)
        }
    }

    /// Redis connection settings
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            addresses: self.addresses.clone(),
            mode: self.redis_mode,
            pool_size: self.pool_size,
        }
    }

    /// Check values that cannot be defaulted
    ///
    /// The queue name is checked at construction, where an empty name
    /// reports [`Error::InvalidKey`].
    pub fn validate(&self) -> Result<()> {
        if self.addresses.iter().all(|a| a.trim().is_empty()) {
            return Err(Error::Config("at least one store address is required".into()));
        }
        if self.rate_limit_period.is_zero() {
            return Err(Error::Config("rate_limit_period must be greater than 0".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be greater than 0".into()));
        }
        if self.max_in_flight == Some(0) {
            return Err(Error::Config("max_in_flight must be greater than 0".into()));
        }
        Ok(())
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
