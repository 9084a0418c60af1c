//! Run orchestration
//!
//! Validates the config, discovers the corpus, then feeds each test case to a
//! [`TestExecutor`] and each result to a [`TestReporter`], in discovery order.
//!
//! With `jobs > 1` up to that many tests execute concurrently, but results are
//! still consumed in discovery order on the caller's task. The summary is only
//! touched there, so it needs no locking, and the console output is identical
//! to a sequential run apart from durations.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::discovery::{TestCase, discover};
use crate::errors::{HarnessError, Result};
use crate::report::{Summary, TestReporter};
use crate::runner::{CancelHandle, ProcessExecutor, TestExecutor, TestResult};

/// A configured harness run.
pub struct Harness {
    config: HarnessConfig,
    cancel: CancelHandle,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle that interrupts the run and kills any running interpreter.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Validate, discover and run every test case.
    pub async fn run<R: TestReporter>(&self, reporter: &mut R) -> Result<Summary> {
        self.config.validate()?;

        let cases = discover(&self.config.root, &self.config.suffix)?;
        info!(
            "discovered {} test(s) under {}",
            cases.len(),
            self.config.root.display()
        );

        let executor = ProcessExecutor::new(&self.config.executable, self.config.timeout)
            .with_cancel(self.cancel.token());
        run_cases(cases, Arc::new(executor), self.config.jobs, &self.cancel, reporter).await
    }
}

/// Execute `cases` and report each result in order.
///
/// Stops at the first harness error. In parallel mode the remaining tests are
/// cancelled through `cancel` and awaited before the error is returned, so no
/// interpreter outlives the call.
pub async fn run_cases<E, R>(
    cases: Vec<TestCase>,
    executor: Arc<E>,
    jobs: usize,
    cancel: &CancelHandle,
    reporter: &mut R,
) -> Result<Summary>
where
    E: TestExecutor + 'static,
    R: TestReporter,
{
    let mut summary = Summary::new(cases.len());
    reporter.on_run_start(summary.total)?;

    if jobs <= 1 {
        for case in &cases {
            let result = executor.execute(case).await?;
            record(&mut summary, reporter, case, &result)?;
        }
    } else {
        let mut pending = spawn_pool(&cases, executor, jobs).into_iter();

        for case in &cases {
            let Some(handle) = pending.next() else { break };
            let outcome = handle.await.map_err(HarnessError::from).and_then(|result| result);
            let recorded = outcome.and_then(|result| record(&mut summary, reporter, case, &result));

            if let Err(e) = recorded {
                debug!("stopping run: {}", e);
                cancel.cancel();
                for handle in pending.by_ref() {
                    let _ = handle.await;
                }
                return Err(e);
            }
        }
    }

    reporter.on_run_complete(&summary)?;
    Ok(summary)
}

fn spawn_pool<E>(cases: &[TestCase], executor: Arc<E>, jobs: usize) -> Vec<JoinHandle<Result<TestResult>>>
where
    E: TestExecutor + 'static,
{
    let permits = Arc::new(Semaphore::new(jobs));

    cases
        .iter()
        .cloned()
        .map(|case| {
            let executor = Arc::clone(&executor);
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| HarnessError::Interrupted)?;
                executor.execute(&case).await
            })
        })
        .collect()
}

fn record<R: TestReporter>(
    summary: &mut Summary,
    reporter: &mut R,
    case: &TestCase,
    result: &TestResult,
) -> Result<()> {
    summary.record(result);
    reporter.on_test_complete(case, result)?;
    Ok(())
}
