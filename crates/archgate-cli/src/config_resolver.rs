//! Locating and loading `archgate.toml`.
//!
//! Lookup order:
//!
//! 1. `--config PATH`
//! 2. `{project}/archgate.toml`, then `{project}/.archgate.toml`
//! 3. `$ARCHGATE_CONFIG_DIR/config.toml`, or `~/.archgate/config.toml`
//! 4. built-in defaults

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archgate::config::{CONFIG_FILE_NAME, HIDDEN_CONFIG_FILE_NAME};
use archgate::{Config, EngineConfig};

/// Environment variable overriding the global config directory.
pub const CONFIG_DIR_ENV: &str = "ARCHGATE_CONFIG_DIR";

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Returns the file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads the configuration and resolves it against `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid.
    pub fn load(&self, root: &Path) -> Result<EngineConfig> {
        let config = match self.path() {
            Some(p) => {
                if matches!(self, Self::Global(_)) {
                    tracing::info!("Using global config: {}", p.display());
                }
                Config::from_file(p).with_context(|| format!("Failed to load {}", p.display()))?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        };
        let resolved = config
            .resolve(root)
            .context("Invalid configuration")?
            .with_tool_version(env!("CARGO_PKG_VERSION"));
        Ok(resolved)
    }
}

/// Finds the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir())
}

fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(found) = [CONFIG_FILE_NAME, HIDDEN_CONFIG_FILE_NAME]
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file())
    {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|p| p.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// `$ARCHGATE_CONFIG_DIR`, or `~/.archgate`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".archgate"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins_and_is_not_checked() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(CONFIG_FILE_NAME), "").unwrap();

        let result = resolve_in(project.path(), Some(Path::new("/missing.toml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/missing.toml")));
    }

    #[test]
    fn visible_name_preferred_over_hidden() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(HIDDEN_CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join(HIDDEN_CONFIG_FILE_NAME))
        );

        fs::write(project.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn global_only_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let global_dir = Some(global.path().to_path_buf());

        assert_eq!(
            resolve_in(project.path(), None, global_dir.clone()),
            ConfigSource::Default
        );

        fs::write(global.path().join(GLOBAL_CONFIG_NAME), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, global_dir.clone()),
            ConfigSource::Global(global.path().join(GLOBAL_CONFIG_NAME))
        );

        fs::write(project.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert!(matches!(
            resolve_in(project.path(), None, global_dir),
            ConfigSource::Project(_)
        ));
    }

    #[test]
    fn default_source_loads_defaults() {
        let project = TempDir::new().unwrap();
        let config = ConfigSource::Default.load(project.path()).unwrap();
        assert_eq!(config.root, project.path());
        assert_eq!(config.rules, [project.path().join("archgate.rules")]);
        assert!(config.tool_version.is_some());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let project = TempDir::new().unwrap();
        let path = project.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[engine]\nfail_on = \"loud\"").unwrap();
        assert!(ConfigSource::Project(path).load(project.path()).is_err());
    }
}
