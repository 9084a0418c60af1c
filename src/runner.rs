//! Test execution
//!
//! Each test case runs as `<interpreter> <test file>` in a fresh process group.
//! The executor waits for whichever comes first: process exit (with both output
//! streams drained), the timeout ceiling, or cancellation. The last two kill the
//! whole process group, so an interpreter that forks helpers cannot leave
//! orphans behind.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::discovery::TestCase;
use crate::errors::{HarnessError, Result};

/// Stderr text recorded for a test that hit the timeout ceiling.
pub const TIMEOUT_MARKER: &str = "Timeout";

/// Outcome of running one test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub passed: bool,
    /// Wall-clock time from spawn to exit; exactly the ceiling on timeout
    pub duration: Duration,
    /// Captured stdout, trimmed
    pub stdout: String,
    /// Captured stderr, trimmed
    pub stderr: String,
    pub timed_out: bool,
    /// `None` when the child was killed by a signal or timed out
    pub exit_code: Option<i32>,
}

impl TestResult {
    /// Result for a child that exited on its own.
    pub fn completed(exit_code: Option<i32>, duration: Duration, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            passed: exit_code == Some(0),
            duration,
            stdout: String::from_utf8_lossy(stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
            timed_out: false,
            exit_code,
        }
    }

    /// Result for a child that was killed at the ceiling.
    pub fn timed_out(ceiling: Duration) -> Self {
        Self {
            passed: false,
            duration: ceiling,
            stdout: String::new(),
            stderr: TIMEOUT_MARKER.to_string(),
            timed_out: true,
            exit_code: None,
        }
    }

    fn from_status(status: ExitStatus, duration: Duration, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::completed(status.code(), duration, stdout, stderr)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Fires cancellation for every [`CancelToken`] created from it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes a [`CancelHandle`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancelHandle::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation fires. Never resolves if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Runs a single test case to completion.
///
/// `Err` is reserved for harness failures (the interpreter could not be
/// started, the run was interrupted). A failing or hanging test is an `Ok`
/// result with `passed == false`.
pub trait TestExecutor: Send + Sync {
    fn execute(&self, case: &TestCase) -> impl Future<Output = Result<TestResult>> + Send;
}

/// Executes test cases by spawning the interpreter under test.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    executable: PathBuf,
    timeout: Duration,
    cancel: CancelToken,
}

enum Outcome {
    Finished(std::io::Result<(ExitStatus, Duration, Vec<u8>, Vec<u8>)>),
    TimedOut,
    Cancelled,
}

impl ProcessExecutor {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            cancel: CancelToken::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn command(&self, case: &TestCase) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(&case.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take out every descendant
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl TestExecutor for ProcessExecutor {
    async fn execute(&self, case: &TestCase) -> Result<TestResult> {
        if self.cancel.is_cancelled() {
            return Err(HarnessError::Interrupted);
        }

        debug!("spawning {} {}", self.executable.display(), case.path.display());
        let start = Instant::now();
        let mut child = self.command(case).spawn().map_err(|source| HarnessError::Spawn {
            program: self.executable.clone(),
            source,
        })?;

        // Taken now: once the child is reaped `id()` is gone, but its group may
        // still hold descendants
        let pgid = child.id();

        let outcome = tokio::select! {
            result = wait_with_output(&mut child, start) => Outcome::Finished(result),
            () = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
            () = self.cancel.cancelled() => Outcome::Cancelled,
        };

        match outcome {
            Outcome::Finished(result) => {
                let (status, duration, stdout, stderr) = result?;
                debug!(
                    "{} exited with {:?} after {:.4}s",
                    case.display,
                    status.code(),
                    duration.as_secs_f64()
                );
                Ok(TestResult::from_status(status, duration, &stdout, &stderr))
            }
            Outcome::TimedOut => {
                info!("{} exceeded {:?}, killing process group", case.display, self.timeout);
                terminate(&mut child, pgid).await;
                Ok(TestResult::timed_out(self.timeout))
            }
            Outcome::Cancelled => {
                debug!("{} cancelled, killing process group", case.display);
                terminate(&mut child, pgid).await;
                Err(HarnessError::Interrupted)
            }
        }
    }
}

/// Wait for exit while draining both pipes, so a chatty child never blocks on
/// a full pipe buffer.
///
/// The duration is measured at process exit, not at pipe EOF, so a descendant
/// that keeps a pipe open does not inflate it.
async fn wait_with_output(
    child: &mut Child,
    start: Instant,
) -> std::io::Result<(ExitStatus, Duration, Vec<u8>, Vec<u8>)> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let exited = async {
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, start.elapsed()))
    };
    let ((status, duration), stdout, stderr) =
        tokio::try_join!(exited, read_all(stdout.as_mut()), read_all(stderr.as_mut()))?;
    Ok((status, duration, stdout, stderr))
}

async fn read_all<R: AsyncRead + Unpin>(stream: Option<&mut R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kill the child's process group, then the child itself, and reap it.
///
/// `pgid` is the child's pid captured at spawn. The child may already be reaped
/// while descendants in its group still run; the id cannot be reused until the
/// whole group is gone.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pgid) = pgid {
            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => {}
                Err(Errno::ESRCH) => debug!("process group {} already gone", pgid),
                Err(e) => warn!("failed to kill process group {}: {}", pgid, e),
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    if let Err(e) = child.kill().await {
        debug!("child already gone: {}", e);
    }
}
