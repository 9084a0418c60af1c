//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::io::{self, IsTerminal};

use tracing::{debug, warn};

use super::{Cli, CliError, CliResult, ExitCode, ReportFormat};
use crate::config::{FileConfig, HarnessConfig, timeout_from_secs};
use crate::errors::{HarnessError, Result};
use crate::harness::Harness;
use crate::report::{ConsoleReporter, JsonReporter, Summary};

/// Merge command-line/environment values over the optional config file.
pub fn resolve_config(cli: &Cli) -> Result<HarnessConfig> {
    let file = match &cli.config_file {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let executable = cli.executable.clone().or(file.executable).ok_or_else(|| {
        HarnessError::Config("no interpreter given (use --exe, ROS_HARNESS_EXE or the config file)".to_string())
    })?;
    let root = cli.root.clone().or(file.root).ok_or_else(|| {
        HarnessError::Config("no test root given (use --root, ROS_HARNESS_ROOT or the config file)".to_string())
    })?;

    let mut config = HarnessConfig::new(executable, root);
    if let Some(secs) = cli.timeout_secs.or(file.timeout_secs) {
        config = config.with_timeout(timeout_from_secs(secs)?);
    }
    if let Some(suffix) = cli.suffix.clone().or(file.suffix) {
        config = config.with_suffix(suffix);
    }
    if let Some(jobs) = cli.jobs.or(file.jobs) {
        config = config.with_jobs(jobs);
    }

    debug!("resolved config: {:?}", config);
    Ok(config)
}

/// Run the whole corpus and map the summary to an exit code.
pub async fn run_harness(cli: Cli) -> CliResult<ExitCode> {
    let config = resolve_config(&cli)?;
    let harness = Harness::new(config);

    let cancel = harness.cancel_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel.cancel(),
            Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
        }
    });

    let summary = match cli.format {
        ReportFormat::Console => {
            let mut reporter = ConsoleReporter::new(io::stdout()).with_color(use_color(cli.no_color));
            harness.run(&mut reporter).await?
        }
        ReportFormat::Json => harness.run(&mut JsonReporter::new(io::stdout())).await?,
    };

    exit_code(&summary)
}

fn exit_code(summary: &Summary) -> CliResult<ExitCode> {
    if summary.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        debug!("{} of {} test(s) failed", summary.failed(), summary.total);
        // Summary already printed
        Err(CliError::failure(""))
    }
}

fn use_color(no_color: bool) -> bool {
    !no_color && env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}
