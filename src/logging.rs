//! Process-wide `tracing` subscriber setup.

use std::fs;
use std::str::FromStr;

use thiserror::Error;
use time::format_description::{self, OwnedFormatItem};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::{LogOutput, LoggingConfig};

const TIMESTAMP_FORMAT: &str =
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level {0:?}")]
    InvalidLevel(String),
    #[error("invalid timestamp format: {0}")]
    TimestampFormat(String),
    #[error("failed to prepare log directory {dir}: {source}")]
    Io {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Keeps the background log writer alive; flushes on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let level = parse_level(&config.level)?;
    let timer = UtcTime::new(timestamp_format()?);

    match config.output {
        LogOutput::Stdout => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_timer(timer)
                .try_init()
                .map_err(|err| LoggingError::Subscriber(err.to_string()))?;
            Ok(LoggingGuard { _worker: None })
        }
        LogOutput::File => {
            fs::create_dir_all(&config.dir).map_err(|source| LoggingError::Io {
                dir: config.dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_timer(timer)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|err| LoggingError::Subscriber(err.to_string()))?;
            Ok(LoggingGuard {
                _worker: Some(worker),
            })
        }
    }
}

fn parse_level(raw: &str) -> Result<Level, LoggingError> {
    Level::from_str(raw.trim()).map_err(|_| LoggingError::InvalidLevel(raw.to_string()))
}

fn timestamp_format() -> Result<OwnedFormatItem, LoggingError> {
    format_description::parse_owned::<2>(TIMESTAMP_FORMAT)
        .map_err(|err| LoggingError::TimestampFormat(err.to_string()))
}
