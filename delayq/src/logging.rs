//! Logging setup
//!
//! Builds the process log sink: a file in a configurable directory, stdout,
//! or both, formatted as text or JSON. The queue itself only emits `tracing`
//! events; installing a subscriber is left to the application.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines with full timestamps
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Log sink options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// Directory of the log file, created if missing; no file when unset
    pub directory: Option<PathBuf>,
    /// Log file name inside `directory`
    pub file_name: String,
    /// Line format
    pub format: LogFormat,
    /// Also write to stdout
    pub stdout: bool,
    /// Include source file and line of each event
    pub report_caller: bool,
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: "delayq.log".to_string(),
            format: LogFormat::Text,
            stdout: true,
            report_caller: false,
            level: "info".to_string(),
        }
    }
}

/// Keeps the background file writer alive; drop it at exit to flush
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global `tracing` subscriber described by `options`
///
/// # Errors
///
/// Returns [`Error::Config`] when no sink is enabled, the log file cannot be
/// created, the filter does not parse, or a subscriber is already installed.
pub fn init_logging(options: &LogOptions) -> Result<LogGuard> {
    let (writer, guard) = make_writer(options)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.level)
            .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", options.level, e)))?,
    };

    let ansi = options.directory.is_none();
    let layer = match options.format {
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(options.report_caller)
            .with_line_number(options.report_caller)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_file(options.report_caller)
            .with_line_number(options.report_caller)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("logger already initialized: {}", e)))?;

    Ok(LogGuard { _file: guard })
}

fn make_writer(options: &LogOptions) -> Result<(BoxMakeWriter, Option<WorkerGuard>)> {
    let Some(directory) = &options.directory else {
        if !options.stdout {
            return Err(Error::Config("no log sink enabled".into()));
        }
        return Ok((BoxMakeWriter::new(std::io::stdout), None));
    };

    std::fs::create_dir_all(directory)
        .map_err(|e| Error::Config(format!("cannot create {}: {}", directory.display(), e)))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&options.file_name)
        .build(directory)
        .map_err(|e| Error::Config(format!("cannot open log file: {}", e)))?;
    let (file, guard) = tracing_appender::non_blocking(appender);

    let writer = if options.stdout {
        BoxMakeWriter::new(file.and(std::io::stdout))
    } else {
        BoxMakeWriter::new(file)
    };
    Ok((writer, Some(guard)))
}
