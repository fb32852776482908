//! Filesystem snapshot store.

use std::path::{Path, PathBuf};

use archgate_core::snapshot::{Snapshot, SnapshotRef, SnapshotStore, SNAPSHOT_SCHEMA_VERSION};
use tracing::{debug, warn};

/// Directory, relative to the project root, holding snapshots.
pub const SNAPSHOT_DIR: &str = ".archgate/snapshots";

/// Errors from [`FsSnapshotStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No snapshot under the ref.
    #[error("snapshot `{reference}` not found at {path}")]
    NotFound {
        /// The ref.
        reference: SnapshotRef,
        /// Where it was looked for.
        path: PathBuf,
    },

    /// Reading or writing failed.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not a snapshot.
    #[error("invalid snapshot {path}: {source}")]
    Json {
        /// Snapshot file.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The file was written by a newer layout.
    #[error(
        "snapshot {path} has schema version {found}, expected at most {max}",
        max = SNAPSHOT_SCHEMA_VERSION
    )]
    UnsupportedVersion {
        /// Snapshot file.
        path: PathBuf,
        /// Version found.
        found: u32,
    },
}

/// Stores snapshots as pretty JSON under `{root}/.archgate/snapshots/{ref}.json`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    /// Store for the project at `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(SNAPSHOT_DIR),
        }
    }

    /// Store rooted directly at `dir`.
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `reference`.
    #[must_use]
    pub fn path_for(&self, reference: &SnapshotRef) -> PathBuf {
        self.dir.join(format!("{reference}.json"))
    }

    /// Refs of every stored snapshot, sorted.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<SnapshotRef>, StoreError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let mut refs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(r) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| SnapshotRef::new(s).ok())
            {
                refs.push(r);
            }
        }
        refs.sort();
        Ok(refs)
    }
}

impl SnapshotStore for FsSnapshotStore {
    type Location = PathBuf;
    type Error = StoreError;

    fn load(&self, reference: &SnapshotRef) -> Result<Snapshot, StoreError> {
        let path = self.path_for(reference);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    reference: reference.clone(),
                    path,
                })
            }
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| StoreError::Json {
            path: path.clone(),
            source: e,
        })?;
        if snapshot.meta.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path,
                found: snapshot.meta.schema_version,
            });
        }
        if !snapshot.verify_fingerprint() {
            warn!(path = %path.display(), "snapshot fingerprint does not match its graph");
        }
        debug!(path = %path.display(), nodes = snapshot.nodes.len(), "loaded snapshot");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot, reference: &SnapshotRef) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self.path_for(reference);
        let mut json = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Json {
            path: path.clone(),
            source: e,
        })?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), "saved snapshot");
        Ok(path)
    }

    fn exists(&self, reference: &SnapshotRef) -> bool {
        self.path_for(reference).is_file()
    }
}
