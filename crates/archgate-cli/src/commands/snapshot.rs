//! Snapshot subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use archgate::snapshot::SnapshotRef;
use archgate::Engine;

use crate::OutputFormat;

/// Builds the current graph and saves it under `reference`.
pub fn save(path: &Path, explicit: Option<&Path>, reference: &SnapshotRef) -> Result<()> {
    let config = super::load_config(path, explicit)?;
    let saved = Engine::new(config)
        .save_snapshot(reference)
        .with_context(|| format!("Failed to save snapshot `{reference}`"))?;
    println!("Saved snapshot `{reference}` to {}", saved.display());
    Ok(())
}

/// Prints the difference between two stored snapshots.
pub fn diff(
    path: &Path,
    explicit: Option<&Path>,
    from: &SnapshotRef,
    to: &SnapshotRef,
    details: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = super::load_config(path, explicit)?;
    let diff = Engine::new(config)
        .diff(from, to, details)
        .with_context(|| format!("Failed to diff `{from}` and `{to}`"))?;
    super::output::print_diff(&diff, from.as_str(), to.as_str(), format)
}
