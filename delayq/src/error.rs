//! Error type definitions
//!
//! Provides all error kinds surfaced by the queue client.

use std::time::Duration;

/// Result type alias for delayq
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the delayq queue
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Queue name was empty
    #[error("Invalid queue key: queue name must not be empty")]
    InvalidKey,

    /// Store did not answer the liveness probe during construction
    #[error("Store unreachable: {0}")]
    StoreUnreachable(String),

    /// Envelope could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A write command against the store failed
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// A read command against the store failed
    #[error("Store read error: {0}")]
    StoreRead(String),

    /// Redis client construction errors
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::RedisError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the error is a transient store I/O failure
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::StoreWrite(_) | Error::StoreRead(_) | Error::Redis(_)
        )
    }

    /// Get the suggested idle before retrying the failed operation
    ///
    /// `None` means retrying after `backoff` will not help; background loops
    /// fall back to their regular poll cadence.
    pub fn retry_after(&self, backoff: Duration) -> Option<Duration> {
        if self.is_transient() {
            Some(backoff)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        use fred::error::RedisErrorKind;
        assert!(Error::Redis(fred::error::RedisError::new(RedisErrorKind::IO, "test")).is_transient());
        assert!(Error::StoreRead("test".to_string()).is_transient());
        assert!(Error::StoreWrite("test".to_string()).is_transient());
        assert!(!Error::InvalidKey.is_transient());
        assert!(!Error::Serialization("test".to_string()).is_transient());
    }

    #[test]
    fn test_retry_after() {
        let backoff = Duration::from_millis(250);
        assert_eq!(Error::StoreRead("x".into()).retry_after(backoff), Some(backoff));
        assert_eq!(Error::InvalidKey.retry_after(backoff), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::InvalidKey.to_string(),
            "Invalid queue key: queue name must not be empty"
        );
        assert_eq!(
            Error::StoreUnreachable("ping timed out".into()).to_string(),
            "Store unreachable: ping timed out"
        );
    }
}
