//! Baseline subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use archgate::snapshot::SnapshotRef;
use archgate::Engine;

/// Evaluates the rules and records the result as the accepted baseline.
pub fn create(path: &Path, explicit: Option<&Path>, reference: &SnapshotRef) -> Result<()> {
    let config = super::load_config(path, explicit)?;
    let saved = Engine::new(config)
        .create_baseline(reference)
        .with_context(|| format!("Failed to create baseline `{reference}`"))?;

    println!("Created baseline `{reference}` at {}", saved.display());
    println!("\nNext steps:");
    println!("  1. Commit {}", saved.display());
    println!("  2. Set `baseline = \"{reference}\"` under [engine] in archgate.toml");
    Ok(())
}
