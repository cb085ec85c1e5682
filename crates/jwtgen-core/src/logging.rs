//! Tracing subscriber setup.
//!
//! Interactive sessions own the terminal, so they log to a file through a
//! non-blocking appender. Plain commands log to stderr. `RUST_LOG` wins over
//! the configured level in both cases.

use std::fs;
use std::io;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to the configured log file (full-screen UI).
    File,
    /// Write to stderr (non-interactive commands).
    Stderr,
}

/// Keeps the non-blocking writer alive; drop it last to flush.
#[derive(Debug)]
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

impl LogGuard {
    /// Guard for a run without a subscriber; every event is dropped.
    pub fn disabled() -> Self {
        Self { _guard: None }
    }
}

/// Parses a level name, falling back to `info` for anything unrecognized.
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::INFO)
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(&config.log.level).into())
        .from_env_lossy()
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed. Nothing is installed in that case.
pub fn init(config: &Config, target: LogTarget) -> Result<LogGuard> {
    let filter = env_filter(config);

    match target {
        LogTarget::File => {
            let path = config.log_file_path();
            let dir = path
                .parent()
                .context("Log file path has no parent directory")?;
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .context("Log file path has no file name")?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(dir)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

            Ok(LogGuard {
                _guard: Some(guard),
            })
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .compact()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

            Ok(LogGuard { _guard: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_log_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let mut config = Config::default();
        config.log.file = blocker.join("jwtgen.log").display().to_string();

        let err = init(&config, LogTarget::File).unwrap_err();

        assert!(format!("{err:#}").contains("log"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" WARN "), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("chatty"), LevelFilter::INFO);
    }
}
