//! `archgate.toml` loading.
//!
//! The file is deserialized into [`Config`] and then resolved against a
//! project root into an [`EngineConfig`], which is what the engine runs on.

use std::path::{Path, PathBuf};

use archgate_core::ir::{DanglingEdges, GlobMatcher, NormalizeOptions};
use archgate_core::snapshot::SnapshotRef;
use archgate_core::Severity;
use serde::{Deserialize, Serialize};

/// File name looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "archgate.toml";

/// Hidden variant of [`CONFIG_FILE_NAME`].
pub const HIDDEN_CONFIG_FILE_NAME: &str = ".archgate.toml";

/// Starter configuration written by `archgate init`.
pub const DEFAULT_CONFIG: &str = r#"# archgate configuration

[engine]
# IR fragments produced by extractors (globs relative to the project root)
fragments = ["build/ir/**/*.json"]

# Rule files or directories containing *.rules files
rules = ["archgate.rules"]

# Architecture model (layers, containers, contexts)
# model = "architecture.toml"

# Snapshot ref holding the accepted violations
# baseline = "baseline"

# Lowest severity of a new violation that fails the run: info, warning, error
fail_on = "error"

# Edges whose endpoint is missing from the graph: "drop" or "keep"
dangling_edges = "drop"

# Save a snapshot of every checked graph under this ref
# save_ref = "latest"
"#;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSection,
}

/// The `[engine]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Fragment globs, relative to the root.
    #[serde(default = "default_fragments")]
    pub fragments: Vec<String>,
    /// Rule files or directories, relative to the root.
    #[serde(default = "default_rules")]
    pub rules: Vec<PathBuf>,
    /// Architecture model file.
    #[serde(default)]
    pub model: Option<PathBuf>,
    /// Baseline snapshot ref.
    #[serde(default)]
    pub baseline: Option<String>,
    /// Failure threshold.
    #[serde(default)]
    pub fail_on: Severity,
    /// Dangling-edge policy.
    #[serde(default)]
    pub dangling_edges: DanglingEdges,
    /// Ref to save every checked graph under.
    #[serde(default)]
    pub save_ref: Option<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            fragments: default_fragments(),
            rules: default_rules(),
            model: None,
            baseline: None,
            fail_on: Severity::Error,
            dangling_edges: DanglingEdges::Drop,
            save_ref: None,
        }
    }
}

fn default_fragments() -> Vec<String> {
    vec!["build/ir/**/*.json".to_string()]
}

fn default_rules() -> Vec<PathBuf> {
    vec![PathBuf::from("archgate.rules")]
}

impl Config {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Validates the settings and anchors relative paths at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed globs and snapshot
    /// refs.
    pub fn resolve(&self, root: &Path) -> Result<EngineConfig, ConfigError> {
        let engine = &self.engine;

        for (i, pattern) in engine.fragments.iter().enumerate() {
            GlobMatcher::new(pattern).map_err(|e| ConfigError::Invalid {
                field: format!("engine.fragments[{i}]"),
                message: e.to_string(),
            })?;
        }

        Ok(EngineConfig {
            root: root.to_path_buf(),
            fragments: engine.fragments.clone(),
            rules: engine.rules.iter().map(|p| anchor(root, p)).collect(),
            model: engine.model.as_deref().map(|p| anchor(root, p)),
            baseline: parse_ref(engine.baseline.as_deref(), "engine.baseline")?,
            fail_on: engine.fail_on,
            normalize: NormalizeOptions {
                dangling: engine.dangling_edges,
            },
            save_ref: parse_ref(engine.save_ref.as_deref(), "engine.save_ref")?,
            tool_version: None,
        })
    }
}

fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn parse_ref(value: Option<&str>, field: &str) -> Result<Option<SnapshotRef>, ConfigError> {
    value
        .map(|v| {
            SnapshotRef::new(v).map_err(|e| ConfigError::Invalid {
                field: field.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Resolved settings for one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Project root.
    pub root: PathBuf,
    /// Fragment globs, relative to `root`.
    pub fragments: Vec<String>,
    /// Rule files or directories.
    pub rules: Vec<PathBuf>,
    /// Architecture model file.
    pub model: Option<PathBuf>,
    /// Baseline ref.
    pub baseline: Option<SnapshotRef>,
    /// Failure threshold.
    pub fail_on: Severity,
    /// Normalization options.
    pub normalize: NormalizeOptions,
    /// Ref to save every checked graph under.
    pub save_ref: Option<SnapshotRef>,
    /// Version recorded in snapshots and reports.
    pub tool_version: Option<String>,
}

impl EngineConfig {
    /// Defaults for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            rules: default_rules().iter().map(|p| root.join(p)).collect(),
            root,
            fragments: default_fragments(),
            model: None,
            baseline: None,
            fail_on: Severity::Error,
            normalize: NormalizeOptions::default(),
            save_ref: None,
            tool_version: None,
        }
    }

    /// Records the tool version.
    #[must_use]
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in the config file.
    #[error("failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A setting with an invalid value.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted path of the setting.
        field: String,
        /// What is wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.engine, EngineSection::default());
        assert_eq!(config.engine.fail_on, Severity::Error);
    }

    #[test]
    fn default_template_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.engine.fragments, ["build/ir/**/*.json"]);
        assert!(config.engine.model.is_none());
    }

    #[test]
    fn parses_full_engine_table() {
        let config = Config::parse(
            r#"
[engine]
fragments = ["ir/*.json"]
rules = ["rules/", "/abs/extra.rules"]
model = "architecture.toml"
baseline = "baseline"
fail_on = "warning"
dangling_edges = "keep"
save_ref = "latest"
"#,
        )
        .unwrap();
        let resolved = config.resolve(Path::new("/repo")).unwrap();
        assert_eq!(resolved.rules[0], PathBuf::from("/repo/rules/"));
        assert_eq!(resolved.rules[1], PathBuf::from("/abs/extra.rules"));
        assert_eq!(resolved.model, Some(PathBuf::from("/repo/architecture.toml")));
        assert_eq!(resolved.baseline, Some(SnapshotRef::baseline()));
        assert_eq!(resolved.fail_on, Severity::Warning);
        assert_eq!(resolved.normalize.dangling, DanglingEdges::Keep);
    }

    #[test]
    fn rejects_bad_refs_and_globs() {
        let config = Config::parse("[engine]\nbaseline = \"../x\"").unwrap();
        assert!(matches!(
            config.resolve(Path::new(".")),
            Err(ConfigError::Invalid { field, .. }) if field == "engine.baseline"
        ));

        let config = Config::parse("[engine]\nfragments = [\"[\"]").unwrap();
        assert!(matches!(
            config.resolve(Path::new(".")),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_unknown_severity() {
        assert!(matches!(
            Config::parse("[engine]\nfail_on = \"critical\""),
            Err(ConfigError::Parse { .. })
        ));
    }
}
