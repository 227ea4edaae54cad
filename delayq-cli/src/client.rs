//! Configuration and connection helpers for CLI commands

use color_eyre::Result;
use delayq::{Producer, QueueBuilder, QueueConfig};
use std::path::Path;

/// Build the effective configuration
///
/// Starts from the JSON file when given, otherwise defaults, then applies
/// the command line overrides.
pub fn load_config(
    path: Option<&Path>,
    queue: Option<String>,
    redis: Vec<String>,
    cluster: bool,
) -> Result<QueueConfig> {
    let mut config = match path {
        Some(path) => QueueConfig::from_json_file(path)?,
        None => QueueConfig::default(),
    };

    if let Some(queue) = queue {
        config = config.with_queue_name(queue);
    }
    if !redis.is_empty() {
        config = config.with_addresses(redis);
    }
    if cluster {
        config.redis_mode = delayq::storage::RedisMode::Cluster;
    }

    config.validate()?;
    Ok(config)
}

/// Connect a producer for the configured queue
pub async fn connect(config: &QueueConfig) -> Result<Producer> {
    QueueBuilder::from_config(config.clone())
        .connect()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use delayq::storage::RedisMode;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None, None, Vec::new(), false).unwrap();
        assert_eq!(config.queue_name, "default");
        assert_eq!(config.addresses, vec!["localhost:6379"]);
        assert_eq!(config.redis_mode, RedisMode::Standalone);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"queue_name": "from-file", "addresses": ["file:6379"], "rate_limit": 50}}"#).unwrap();

        let config = load_config(
            Some(file.path()),
            Some("override".to_string()),
            vec!["cli:7000".to_string()],
            true,
        )
        .unwrap();

        assert_eq!(config.queue_name, "override");
        assert_eq!(config.addresses, vec!["cli:7000"]);
        assert_eq!(config.redis_mode, RedisMode::Cluster);
        assert_eq!(config.rate_limit, 50);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/delayq.json")), None, Vec::new(), false).is_err());
    }

    #[tokio::test]
    #[ignore = "Requires Redis server"]
    async fn test_connect() {
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let config = load_config(None, Some("cli-test".into()), vec![redis_url], false).unwrap();

        let producer = connect(&config).await;
        assert!(producer.is_ok());
    }
}
