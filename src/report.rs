//! Result reporting
//!
//! ## TestReporter Trait
//!
//! The harness separates reporting from execution through the `TestReporter`
//! trait. Reporters receive every result in discovery order, one at a time,
//! so a test's lines are always written as one uninterrupted block even when
//! tests run in parallel.
//!
//! Two formats ship: the human-readable console format and JSON lines.

use std::io::{self, Write};
use std::time::Duration;

use serde_json::json;

use crate::discovery::TestCase;
use crate::runner::TestResult;

/// Trait for reporting test execution results.
///
/// Implement this trait to customize output format.
pub trait TestReporter {
    /// Called once, after discovery and before the first test runs
    fn on_run_start(&mut self, _total: usize) -> io::Result<()> {
        Ok(())
    }

    /// Called when a test completes
    fn on_test_complete(&mut self, case: &TestCase, result: &TestResult) -> io::Result<()>;

    /// Called when all tests have completed
    fn on_run_complete(&mut self, summary: &Summary) -> io::Result<()>;
}

/// Running pass/total counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
}

impl Summary {
    pub fn new(total: usize) -> Self {
        Self { total, passed: 0 }
    }

    pub fn record(&mut self, result: &TestResult) {
        if result.passed {
            self.passed += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.passed)
    }

    /// True when every discovered test passed (vacuously true for an empty corpus).
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Seconds with four decimals, e.g. `0.0123`.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.4}", duration.as_secs_f64())
}

// ============================================================================
// Console
// ============================================================================

/// Default console reporter.
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    /// Colour the PASSED/FAILED marker with ANSI escapes.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn marker(&self, passed: bool) -> &'static str {
        match (passed, self.color) {
            (true, true) => "\x1b[32mPASSED\x1b[0m",
            (true, false) => "PASSED",
            (false, true) => "\x1b[31mFAILED\x1b[0m",
            (false, false) => "FAILED",
        }
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_run_start(&mut self, total: usize) -> io::Result<()> {
        writeln!(self.out, "Running {} test(s)...", total)?;
        writeln!(self.out)
    }

    fn on_test_complete(&mut self, case: &TestCase, result: &TestResult) -> io::Result<()> {
        writeln!(
            self.out,
            "{} - {} [{}s]",
            self.marker(result.passed),
            case.display,
            format_duration(result.duration)
        )?;

        if !result.passed {
            if !result.stderr.is_empty() {
                writeln!(self.out, "  Error: {}", result.stderr)?;
            }
            if !result.stdout.is_empty() {
                writeln!(self.out, "  Output:\n{}", result.stdout)?;
            }
        }

        self.out.flush()
    }

    fn on_run_complete(&mut self, summary: &Summary) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Summary: {}/{} test(s) passed.", summary.passed, summary.total)?;
        self.out.flush()
    }
}

// ============================================================================
// JSON lines
// ============================================================================

/// Machine-readable reporter: one JSON object per line.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: &serde_json::Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> TestReporter for JsonReporter<W> {
    fn on_run_start(&mut self, total: usize) -> io::Result<()> {
        self.emit(&json!({ "event": "start", "total": total }))
    }

    fn on_test_complete(&mut self, case: &TestCase, result: &TestResult) -> io::Result<()> {
        self.emit(&json!({
            "event": "test",
            "path": case.display,
            "passed": result.passed,
            "timed_out": result.timed_out,
            "exit_code": result.exit_code,
            "duration_secs": result.duration.as_secs_f64(),
            "stdout": result.stdout,
            "stderr": result.stderr,
        }))
    }

    fn on_run_complete(&mut self, summary: &Summary) -> io::Result<()> {
        self.emit(&json!({
            "event": "summary",
            "passed": summary.passed,
            "total": summary.total,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn case(display: &str) -> TestCase {
        TestCase {
            path: PathBuf::from("/corpus").join(display),
            display: display.to_string(),
        }
    }

    fn console_output(f: impl FnOnce(&mut ConsoleReporter<Vec<u8>>)) -> String {
        let mut reporter = ConsoleReporter::new(Vec::new());
        f(&mut reporter);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_format_duration_four_decimals() {
        assert_eq!(format_duration(Duration::from_millis(12)), "0.0120");
        assert_eq!(format_duration(Duration::from_secs(5000)), "5000.0000");
        assert_eq!(format_duration(Duration::ZERO), "0.0000");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::new(3);
        summary.record(&TestResult::completed(Some(0), Duration::ZERO, b"", b""));
        summary.record(&TestResult::completed(Some(1), Duration::ZERO, b"", b""));
        summary.record(&TestResult::timed_out(Duration::from_secs(1)));
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed(), 2);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_empty_summary_is_all_passed() {
        assert!(Summary::new(0).all_passed());
    }

    #[test]
    fn test_passing_line_suppresses_output() {
        let result = TestResult::completed(Some(0), Duration::from_millis(7), b"chatter", b"");
        let out = console_output(|r| r.on_test_complete(&case("a/x.ros"), &result).unwrap());
        assert_eq!(out, "PASSED - a/x.ros [0.0070s]\n");
    }

    #[test]
    fn test_failing_line_includes_error_and_output() {
        let result = TestResult::completed(Some(1), Duration::from_millis(40), b"line 1\nline 2\n", b"boom\n");
        let out = console_output(|r| r.on_test_complete(&case("b/y.ros"), &result).unwrap());
        assert_eq!(out, "FAILED - b/y.ros [0.0400s]\n  Error: boom\n  Output:\nline 1\nline 2\n");
    }

    #[test]
    fn test_failing_line_without_streams() {
        let result = TestResult::completed(Some(2), Duration::from_millis(1), b"", b"");
        let out = console_output(|r| r.on_test_complete(&case("quiet.ros"), &result).unwrap());
        assert_eq!(out, "FAILED - quiet.ros [0.0010s]\n");
    }

    #[test]
    fn test_timeout_line() {
        let result = TestResult::timed_out(Duration::from_secs(5000));
        let out = console_output(|r| r.on_test_complete(&case("loop.ros"), &result).unwrap());
        assert_eq!(out, "FAILED - loop.ros [5000.0000s]\n  Error: Timeout\n");
    }

    #[test]
    fn test_colored_marker() {
        let result = TestResult::completed(Some(0), Duration::ZERO, b"", b"");
        let mut reporter = ConsoleReporter::new(Vec::new()).with_color(true);
        reporter.on_test_complete(&case("a.ros"), &result).unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with("\x1b[32mPASSED\x1b[0m - a.ros"));
    }

    #[test]
    fn test_full_console_run() {
        let out = console_output(|r| {
            let pass = TestResult::completed(Some(0), Duration::from_millis(3), b"", b"");
            let fail = TestResult::completed(Some(1), Duration::from_millis(5), b"", b"boom");
            let mut summary = Summary::new(2);

            r.on_run_start(2).unwrap();
            for (name, result) in [("a/x.ros", &pass), ("b/y.ros", &fail)] {
                summary.record(result);
                r.on_test_complete(&case(name), result).unwrap();
            }
            r.on_run_complete(&summary).unwrap();
        });

        insta::assert_snapshot!(out, @r"
        Running 2 test(s)...

        PASSED - a/x.ros [0.0030s]
        FAILED - b/y.ros [0.0050s]
          Error: boom

        Summary: 1/2 test(s) passed.
        ");
    }

    #[test]
    fn test_json_lines() {
        let mut reporter = JsonReporter::new(Vec::new());
        let fail = TestResult::completed(Some(1), Duration::from_millis(250), b"out", b"boom");
        reporter.on_run_start(1).unwrap();
        reporter.on_test_complete(&case("b/y.ros"), &fail).unwrap();
        reporter.on_run_complete(&Summary { total: 1, passed: 0 }).unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "start");
        assert_eq!(lines[1]["path"], "b/y.ros");
        assert_eq!(lines[1]["passed"], false);
        assert_eq!(lines[1]["exit_code"], 1);
        assert_eq!(lines[1]["stderr"], "boom");
        assert_eq!(lines[1]["duration_secs"], 0.25);
        assert_eq!(lines[2], json!({ "event": "summary", "passed": 0, "total": 1 }));
    }
}
