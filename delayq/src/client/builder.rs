//! Queue builder
//!
//! Validates the configuration, probes the store and starts the background
//! tasks. Nothing is started when any step fails.

use super::{Producer, Queue};
use crate::config::QueueConfig;
use crate::processor::Handler;
use crate::server::{BackgroundTasks, InFlight};
use crate::storage::{QueueKeys, RedisMode, RedisStore, Store};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Queue builder
///
/// # Example
///
/// ```rust,no_run
/// use delayq::{handler_fn, QueueBuilder};
///
/// # async fn example() -> delayq::Result<()> {
/// let queue = QueueBuilder::new()
///     .addresses(["localhost:6379"])
///     .queue_name("emails")
///     .rate_limit(600)
///     .build(handler_fn(|message: String| async move {
///         println!("{}", message);
///     }))
///     .await?;
/// # queue.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    /// Create a builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: QueueConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Set store addresses (`host:port` or `redis://` URLs)
    #[must_use]
    pub fn addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_addresses(addresses);
        self
    }

    /// Set the queue name
    #[must_use]
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_queue_name(name);
        self
    }

    /// Set permits per period; non-positive means the default
    #[must_use]
    pub fn rate_limit(mut self, limit: i64) -> Self {
        self.config = self.config.with_rate_limit(limit);
        self
    }

    /// Set the period the rate limit applies to
    #[must_use]
    pub fn rate_limit_period(mut self, period: Duration) -> Self {
        self.config = self.config.with_rate_limit_period(period);
        self
    }

    /// Set the promoter poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_poll_interval(interval);
        self
    }

    /// Set the idle after background store errors
    #[must_use]
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.config = self.config.with_error_backoff(backoff);
        self
    }

    /// Set the connect and liveness probe deadline
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Set the connection pool size
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Connect in Redis Cluster mode
    #[must_use]
    pub fn cluster_mode(mut self) -> Self {
        self.config.redis_mode = RedisMode::Cluster;
        self
    }

    /// Cap concurrently running handlers
    #[must_use]
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config = self.config.with_max_in_flight(max);
        self
    }

    /// Connect to Redis and start consuming with `handler`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKey`] for an empty queue name, before connecting
    /// - [`Error::Config`] for invalid settings
    /// - [`Error::StoreUnreachable`] when connecting or the liveness probe
    ///   fails or exceeds the connect timeout
    pub async fn build<H: Handler>(self, handler: H) -> Result<Queue> {
        let keys = self.prepare()?;
        let store = self.connect_redis().await?;
        Ok(self.start(store, keys, Arc::new(handler), true))
    }

    /// Start consuming over a caller-supplied store
    ///
    /// Runs the same validation and liveness probe as [`QueueBuilder::build`].
    /// The caller keeps ownership of `store`: [`Queue::shutdown`] does not
    /// close it.
    pub async fn build_with_store<H: Handler>(self, store: Arc<dyn Store>, handler: H) -> Result<Queue> {
        let keys = self.prepare()?;
        self.probe(store.as_ref()).await?;
        Ok(self.start(store, keys, Arc::new(handler), false))
    }

    /// Connect to Redis for producing and inspection only
    ///
    /// No background task is started; entries pushed through the returned
    /// [`Producer`] are dispatched by whichever [`Queue`] consumes the name.
    pub async fn connect(self) -> Result<Producer> {
        let keys = self.prepare()?;
        let store = self.connect_redis().await?;
        Ok(Producer::new(store, keys))
    }

    /// [`QueueBuilder::connect`] over a caller-supplied store
    pub async fn connect_with_store(self, store: Arc<dyn Store>) -> Result<Producer> {
        let keys = self.prepare()?;
        self.probe(store.as_ref()).await?;
        Ok(Producer::new(store, keys))
    }

    fn prepare(&self) -> Result<QueueKeys> {
        let keys = QueueKeys::new(self.config.queue_name.clone())?;
        self.config.validate()?;
        Ok(keys)
    }

    async fn connect_redis(&self) -> Result<Arc<dyn Store>> {
        let redis_config = self.config.redis_config();
        // Malformed addresses are a configuration problem, not an outage
        redis_config.connection_url()?;

        let connecting = async {
            let store = RedisStore::connect(&redis_config).await?;
            store.ping().await?;
            Ok::<_, Error>(store)
        };

        match tokio::time::timeout(self.config.connect_timeout, connecting).await {
            Ok(Ok(store)) => {
                tracing::info!("Connected to Redis at {:?}", self.config.addresses);
                Ok(Arc::new(store))
            }
            Ok(Err(e)) => Err(Error::StoreUnreachable(e.to_string())),
            Err(_) => Err(Error::StoreUnreachable(format!(
                "no answer from {:?} within {:?}",
                self.config.addresses, self.config.connect_timeout
            ))),
        }
    }

    async fn probe(&self, store: &dyn Store) -> Result<()> {
        match tokio::time::timeout(self.config.connect_timeout, store.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::StoreUnreachable(e.to_string())),
            Err(_) => Err(Error::StoreUnreachable(format!(
                "liveness probe exceeded {:?}",
                self.config.connect_timeout
            ))),
        }
    }

    fn start(self, store: Arc<dyn Store>, keys: QueueKeys, handler: Arc<dyn Handler>, owns_store: bool) -> Queue {
        let in_flight = Arc::new(InFlight::new());
        let tasks = BackgroundTasks::spawn(store.clone(), keys.clone(), handler, &self.config, in_flight.clone());

        tracing::info!(
            "Queue {} started: {} permits per {:?}",
            keys.name(),
            self.config.effective_rate_limit(),
            self.config.rate_limit_period
        );

        Queue::new(Producer::new(store, keys), in_flight, tasks, owns_store)
    }
}
