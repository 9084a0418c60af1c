//! CLI module for the test harness
//!
//! ## Usage
//!
//! `ros-harness --exe <INTERPRETER> --root <TEST_DIR> [--timeout SECS] [-j N]`
//!
//! Every option can also come from a TOML file (`--config`) and the
//! interpreter, root and timeout from `ROS_HARNESS_*` environment variables.
//!
//! ## Exit codes
//!
//! - `0` every discovered test passed (including an empty corpus)
//! - `1` at least one test failed or timed out
//! - `2` the harness itself failed (bad config, unreadable root, interpreter
//!   could not be started, interrupted)
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use crate::errors::HarnessError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// One or more tests failed
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The harness could not complete the run
    pub const HARNESS_ERROR: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a harness error (exit code 2).
    pub fn harness(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::HARNESS_ERROR)
    }
}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        Self::harness(format!("error: {}", err))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable PASSED/FAILED lines
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Run an interpreter against every test file under a directory
#[derive(Parser, Debug)]
#[command(name = "ros-harness")]
#[command(version = VERSION)]
#[command(about = "Run an interpreter against every test file under a directory", long_about = None)]
pub struct Cli {
    /// Interpreter executable under test
    #[arg(long = "exe", value_name = "PATH", env = "ROS_HARNESS_EXE")]
    pub executable: Option<PathBuf>,

    /// Root directory of the test corpus
    #[arg(long, value_name = "DIR", env = "ROS_HARNESS_ROOT")]
    pub root: Option<PathBuf>,

    /// Per-test timeout ceiling in seconds (default: 5000)
    #[arg(long = "timeout", value_name = "SECS", env = "ROS_HARNESS_TIMEOUT")]
    pub timeout_secs: Option<f64>,

    /// File-name suffix that marks a test case (default: .ros)
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Number of tests to run concurrently (default: 1)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// TOML config file
    #[arg(short, long = "config", value_name = "FILE", env = "ROS_HARNESS_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Result output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    /// Disable coloured PASSED/FAILED markers
    #[arg(long)]
    pub no_color: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::harness(format!("error: failed to start async runtime: {}", e)))?;

    runtime.block_on(commands::run_harness(cli))
}

// ============================================================================
// Tests
// ============================================================================
