//! Discovery and decoding of extractor IR fragments.

use std::path::{Path, PathBuf};

use archgate_core::ir::{ArchitectureIR, IrFragment};
use tracing::{debug, warn};

/// Errors while loading fragments.
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    /// A fragment glob does not parse.
    #[error("invalid fragment pattern `{pattern}`: {source}")]
    Pattern {
        /// The pattern, anchored at the root.
        pattern: String,
        /// Glob error.
        source: glob::PatternError,
    },

    /// A fragment file could not be read.
    #[error("failed to read fragment {path}: {source}")]
    Io {
        /// Fragment path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A fragment file is not valid fragment JSON.
    #[error("invalid fragment {path}: {source}")]
    Json {
        /// Fragment path.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },
}

/// Finds and decodes fragment files below a root.
#[derive(Debug, Clone)]
pub struct FragmentLoader {
    root: PathBuf,
}

impl FragmentLoader {
    /// Creates a loader anchored at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Paths matching any of `patterns`, sorted and without duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed pattern or an unreadable entry.
    pub fn discover(&self, patterns: &[String]) -> Result<Vec<PathBuf>, FragmentError> {
        let mut files = Vec::new();
        for pattern in patterns {
            let anchored = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                format!("{}/{pattern}", self.root.display())
            };
            let entries = glob::glob(&anchored).map_err(|e| FragmentError::Pattern {
                pattern: anchored.clone(),
                source: e,
            })?;
            let before = files.len();
            for entry in entries {
                let path = entry.map_err(|e| FragmentError::Io {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                })?;
                if path.is_file() {
                    files.push(path);
                }
            }
            if files.len() == before {
                warn!(pattern = %pattern, "fragment pattern matched no files");
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Decodes every fragment matching `patterns`, in path order.
    ///
    /// # Errors
    ///
    /// Returns the first discovery, read or decode error.
    pub fn load(&self, patterns: &[String]) -> Result<Vec<ArchitectureIR>, FragmentError> {
        let files = self.discover(patterns)?;
        let fragments = files
            .iter()
            .map(|path| read_fragment(path))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(fragments = fragments.len(), root = %self.root.display(), "loaded IR fragments");
        Ok(fragments)
    }
}

/// Reads one fragment file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_fragment(path: &Path) -> Result<ArchitectureIR, FragmentError> {
    let content = std::fs::read_to_string(path).map_err(|e| FragmentError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let fragment: IrFragment =
        serde_json::from_str(&content).map_err(|e| FragmentError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(fragment.into_ir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FRAGMENT: &str = r#"{
  "producer": "test",
  "nodes": [{"language": "python", "kind": "module", "fqname": "app.core"}],
  "edges": []
}"#;

    #[test]
    fn discovers_sorted_unique_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("ir/b")).unwrap();
        fs::write(dir.path().join("ir/b/two.json"), FRAGMENT).unwrap();
        fs::write(dir.path().join("ir/one.json"), FRAGMENT).unwrap();

        let loader = FragmentLoader::new(dir.path());
        let files = loader
            .discover(&["ir/**/*.json".to_string(), "ir/*.json".to_string()])
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("ir/b/two.json"));
        assert!(files[1].ends_with("ir/one.json"));
    }

    #[test]
    fn decodes_fragments() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), FRAGMENT).unwrap();

        let irs = FragmentLoader::new(dir.path())
            .load(&["*.json".to_string()])
            .unwrap();

        assert_eq!(irs.len(), 1);
        assert_eq!(irs[0].nodes[0].fqname, "app.core");
        assert_eq!(irs[0].nodes[0].id.as_str(), "python:module:app.core");
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{ nodes: ").unwrap();

        let err = FragmentLoader::new(dir.path())
            .load(&["*.json".to_string()])
            .unwrap_err();
        assert!(matches!(&err, FragmentError::Json { path, .. } if path.ends_with("bad.json")));
    }

    #[test]
    fn unmatched_pattern_is_empty() {
        let dir = TempDir::new().unwrap();
        let irs = FragmentLoader::new(dir.path())
            .load(&["missing/*.json".to_string()])
            .unwrap();
        assert!(irs.is_empty());
    }
}
