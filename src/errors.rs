//! Harness-level errors.
//!
//! Only conditions that make the run itself meaningless live here. A test that
//! exits non-zero or hits the timeout ceiling is a [`TestResult`](crate::runner::TestResult),
//! never an error.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot discover tests under '{path}': {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn interpreter '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run interrupted")]
    Interrupted,

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
