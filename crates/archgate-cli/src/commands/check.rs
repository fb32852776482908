//! Check command implementation.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use archgate::snapshot::SnapshotRef;
use archgate::Engine;

use crate::OutputFormat;

/// Command-line overrides for a check.
#[derive(Debug, Default)]
pub struct CheckOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Rule paths replacing the configured ones.
    pub rules: Vec<PathBuf>,
    /// Baseline ref replacing the configured one.
    pub baseline: Option<SnapshotRef>,
    /// Save ref replacing the configured one.
    pub save_ref: Option<SnapshotRef>,
}

/// Runs the check command.
///
/// Exits with failure when a new violation reaches `fail_on` or a fatal
/// error was recorded.
pub fn run(path: &Path, explicit: Option<&Path>, options: CheckOptions) -> Result<ExitCode> {
    let mut config = super::load_config(path, explicit)?;
    if !options.rules.is_empty() {
        config.rules = options.rules;
    }
    if options.baseline.is_some() {
        config.baseline = options.baseline;
    }
    if options.save_ref.is_some() {
        config.save_ref = options.save_ref;
    }
    let fail_on = config.fail_on;

    tracing::info!("Checking {}", path.display());
    let report = Engine::new(config).check().context("Check failed")?;

    super::output::print_report(&report, options.format, fail_on)?;

    if report.summary.blocking(fail_on) > 0 || report.has_fatal_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
