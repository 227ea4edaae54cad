//! delayq CLI - Command line tool for pushing to and inspecting delayed queues

mod client;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "delayq")]
#[command(about = "delayq CLI - Push to, inspect and consume delayed queues", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Queue name, overrides the configuration
    #[arg(short, long, global = true)]
    queue: Option<String>,

    /// Redis address (repeatable), overrides the configuration
    #[arg(long = "redis", global = true)]
    redis: Vec<String>,

    /// Connect in Redis Cluster mode
    #[arg(long, global = true, default_value_t = false)]
    cluster: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a message
    Push {
        /// JSON payload; anything that is not valid JSON is sent as a string
        payload: String,
        /// Delay in seconds from now
        #[arg(short, long, conflicts_with = "at")]
        delay: Option<u64>,
        /// Absolute unix time (seconds) or plain priority score
        #[arg(long)]
        at: Option<i64>,
        /// Retry count recorded in the envelope
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        retry_count: i64,
    },
    /// Statistics
    Stats,
    /// List waiting messages
    Inspect {
        /// Limit count per collection
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Consume and log messages until Ctrl-C
    Consume {
        /// Messages per period, overrides the configuration
        #[arg(long)]
        rate_limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = client::load_config(cli.config.as_deref(), cli.queue, cli.redis, cli.cluster)?;
    let _log_guard = delayq::logging::init_logging(&config.log.clone().unwrap_or_default())?;

    match cli.command {
        Commands::Push { payload, delay, at, retry_count } => {
            let producer = client::connect(&config).await?;
            let envelope = commands::push::build_envelope(&payload, delay, at, retry_count)?;
            commands::push::run(&producer, &envelope).await?;
            producer.close().await?;
        }
        Commands::Stats => {
            let producer = client::connect(&config).await?;
            commands::stats::show(&producer).await?;
            producer.close().await?;
        }
        Commands::Inspect { limit } => {
            let producer = client::connect(&config).await?;
            commands::inspect::show(&producer, limit).await?;
            producer.close().await?;
        }
        Commands::Consume { rate_limit } => {
            let mut config = config;
            if let Some(limit) = rate_limit {
                config = config.with_rate_limit(limit);
            }
            commands::consume::run(config).await?;
        }
    }

    Ok(())
}
