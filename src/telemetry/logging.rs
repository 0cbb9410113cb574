//! Logging initialization for the runtime substrate.
//!
//! Events are structured JSON, to stderr by default or appended to a file
//! for embedding applications that own stderr. A process can install only
//! one subscriber; `init_logging` surfaces a second attempt as
//! `AlreadyInitialized` instead of silently replacing it.

use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Destination for runtime log events.
#[derive(Debug, Clone, Default)]
pub enum LogOutput {
    /// JSON lines on stderr (default).
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "strata_runtime=debug".
    pub level: String,
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stderr,
        }
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter {0:?}")]
    InvalidFilter(String),
    #[error("cannot open log file: {0}")]
    FileOpen(String),
    #[error("a tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the process-wide subscriber from `config`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|_| LogError::InvalidFilter(config.level.clone()))?;

    let builder = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true);

    match &config.output {
        LogOutput::Stderr => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized),
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| LogError::FileOpen(e.to_string()))?;
            builder
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|_| LogError::AlreadyInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_rejected_before_install() {
        let config = LogConfig {
            level: "not[a(filter".to_string(),
            ..Default::default()
        };
        let err = init_logging(&config).unwrap_err();
        assert!(matches!(err, LogError::InvalidFilter(_)));
        assert!(err.to_string().contains("not[a(filter"));
    }

    #[test]
    fn unwritable_file_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            level: "info".to_string(),
            // A directory, not a file: open must fail.
            output: LogOutput::File(dir.path().to_path_buf()),
        };
        assert!(matches!(init_logging(&config), Err(LogError::FileOpen(_))));
    }

    #[test]
    fn file_target_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.log");
        let config = LogConfig {
            level: "info".to_string(),
            output: LogOutput::File(path.clone()),
        };
        // First init in the process wins; later inits report AlreadyInitialized
        // after the file has been opened for append.
        match init_logging(&config) {
            Ok(()) | Err(LogError::AlreadyInitialized) => assert!(path.exists()),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
