#![forbid(unsafe_code)]
//! Batch test harness for an external interpreter
//!
//! Discovers test files under a directory tree, runs the interpreter under test
//! against each one in its own process, and reports a pass/fail summary. The
//! interpreter is a black box: exit code 0 passes, anything else (including
//! hitting the timeout ceiling) fails.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod harness;
pub mod report;
pub mod runner;

pub use config::{FileConfig, HarnessConfig};
pub use discovery::{TestCase, discover};
pub use errors::HarnessError;
pub use harness::{Harness, run_cases};
pub use report::{ConsoleReporter, JsonReporter, Summary, TestReporter};
pub use runner::{CancelHandle, CancelToken, ProcessExecutor, TestExecutor, TestResult};
