//! Harness configuration
//!
//! Values come from three layers, highest priority first: command-line flags,
//! environment variables (both handled by clap in `cli`), and an optional TOML
//! file loaded with [`FileConfig::load`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{HarnessError, Result};

/// Suffix that marks a file as a test case.
pub const DEFAULT_SUFFIX: &str = ".ros";

/// Timeout ceiling applied when none is configured. Large enough to be
/// effectively unbounded, but still enforced.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5000);

/// Fully resolved settings for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Interpreter under test
    pub executable: PathBuf,
    /// Root of the test corpus
    pub root: PathBuf,
    /// Maximum wall-clock time per test
    pub timeout: Duration,
    /// File-name suffix selecting test cases
    pub suffix: String,
    /// Maximum number of tests running at once
    pub jobs: usize,
}

impl HarnessConfig {
    /// Create a config with default timeout, suffix and a single worker.
    pub fn new(executable: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
            suffix: DEFAULT_SUFFIX.to_string(),
            jobs: 1,
        }
    }

    /// Set the timeout ceiling
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the test-case suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the worker count
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Check that both external paths exist and the numeric settings are usable.
    ///
    /// Runs before discovery so a misconfigured harness never starts executing tests.
    pub fn validate(&self) -> Result<()> {
        if !self.executable.is_file() {
            return Err(HarnessError::Config(format!(
                "interpreter '{}' does not exist or is not a file",
                self.executable.display()
            )));
        }
        if !self.root.is_dir() {
            return Err(HarnessError::Config(format!(
                "test root '{}' does not exist or is not a directory",
                self.root.display()
            )));
        }
        if self.timeout.is_zero() {
            return Err(HarnessError::Config("timeout must be greater than zero".to_string()));
        }
        if self.suffix.is_empty() {
            return Err(HarnessError::Config("test suffix must not be empty".to_string()));
        }
        if self.jobs == 0 {
            return Err(HarnessError::Config("jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Convert a user-supplied number of seconds into a timeout ceiling.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(HarnessError::Config(format!(
            "timeout must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| HarnessError::Config(format!("timeout {secs}s is out of range: {e}")))
}

/// Settings read from a TOML config file. Every key is optional.
///
/// ```toml
/// executable = "../interpreter/bin/ros"
/// root = "unit_tests"
/// timeout_secs = 30
/// jobs = 4
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub executable: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub timeout_secs: Option<f64>,
    pub suffix: Option<String>,
    pub jobs: Option<usize>,
}

impl FileConfig {
    /// Parse config file contents without touching the filesystem.
    pub fn parse(source: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Read and parse a config file. Relative paths inside it are resolved
    /// against the directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&source).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        Ok(config.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        self.executable = self.executable.map(|p| resolve(base, p));
        self.root = self.root.map(|p| resolve(base, p));
        self
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { base.join(path) }
}
