//! Subcommand implementations.

use std::path::Path;

use anyhow::Result;
use archgate::EngineConfig;

use crate::config_resolver;

pub mod baseline;
pub mod check;
pub mod init;
pub mod list_rules;
pub mod output;
pub mod snapshot;

/// Resolves and loads the configuration for the project at `path`.
fn load_config(path: &Path, explicit: Option<&Path>) -> Result<EngineConfig> {
    config_resolver::resolve(path, explicit).load(path)
}
