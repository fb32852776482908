//! Snapshot value types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::{ArchitectureIR, IREdge, IRNode};
use crate::violation::Violation;

/// Version of the on-disk snapshot layout.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// A rejected snapshot name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSnapshotRef {
    /// Empty name.
    #[error("snapshot ref must not be empty")]
    Empty,
    /// Name starting with a dot.
    #[error("snapshot ref `{0}` must not start with `.`")]
    LeadingDot(String),
    /// Character outside `[A-Za-z0-9._-]`.
    #[error("snapshot ref `{name}` contains `{ch}`; use letters, digits, `.`, `_` or `-`")]
    BadChar {
        /// The ref.
        name: String,
        /// First offending character.
        ch: char,
    },
}

/// Name under which a snapshot is stored, such as `latest` or `baseline`.
///
/// Restricted to `[A-Za-z0-9._-]` and not starting with `.`, so a ref is
/// always a safe single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotRef(String);

impl SnapshotRef {
    /// Ref used by `snapshot save` when none is given.
    pub const LATEST: &'static str = "latest";
    /// Ref used for baselines when none is given.
    pub const BASELINE: &'static str = "baseline";

    /// Validates `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSnapshotRef`] for empty names, a leading dot or
    /// characters outside the allowed set.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidSnapshotRef> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidSnapshotRef::Empty);
        }
        if name.starts_with('.') {
            return Err(InvalidSnapshotRef::LeadingDot(name));
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(InvalidSnapshotRef::BadChar { name, ch });
        }
        Ok(Self(name))
    }

    /// The `latest` ref.
    #[must_use]
    pub fn latest() -> Self {
        Self(Self::LATEST.to_string())
    }

    /// The `baseline` ref.
    #[must_use]
    pub fn baseline() -> Self {
        Self(Self::BASELINE.to_string())
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SnapshotRef {
    type Err = InvalidSnapshotRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SnapshotRef {
    type Error = InvalidSnapshotRef;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SnapshotRef> for String {
    fn from(r: SnapshotRef) -> Self {
        r.0
    }
}

/// Metadata recorded with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Layout version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Repository root the graph was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<String>,
    /// Version of the tool that captured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// Capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    /// [`ArchitectureIR::fingerprint`] of the stored graph.
    pub fingerprint: String,
}

fn default_schema_version() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

/// A persisted, normalized graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Metadata.
    pub meta: SnapshotMeta,
    /// Nodes, sorted by id.
    #[serde(default)]
    pub nodes: Vec<IRNode>,
    /// Edges, sorted by `(src, dst, dep_type)`.
    #[serde(default)]
    pub edges: Vec<IREdge>,
    /// Violations, when taken as a baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

impl Snapshot {
    /// Copies the graph out.
    #[must_use]
    pub fn ir(&self) -> ArchitectureIR {
        ArchitectureIR::new(self.nodes.clone(), self.edges.clone())
    }

    /// Moves the graph out.
    #[must_use]
    pub fn into_ir(self) -> ArchitectureIR {
        ArchitectureIR::new(self.nodes, self.edges)
    }

    /// Recomputes the fingerprint and compares it with the stored one.
    #[must_use]
    pub fn verify_fingerprint(&self) -> bool {
        self.ir().fingerprint() == self.meta.fingerprint
    }

    /// Stored violations, or an empty slice.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        self.violations.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_refs() {
        for name in ["latest", "baseline", "v1.2_rc-3"] {
            assert_eq!(SnapshotRef::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_unsafe_refs() {
        assert_eq!(SnapshotRef::new(""), Err(InvalidSnapshotRef::Empty));
        assert!(matches!(
            SnapshotRef::new(".hidden"),
            Err(InvalidSnapshotRef::LeadingDot(_))
        ));
        assert!(matches!(
            SnapshotRef::new("../etc"),
            Err(InvalidSnapshotRef::LeadingDot(_))
        ));
        assert_eq!(
            SnapshotRef::new("a/b"),
            Err(InvalidSnapshotRef::BadChar {
                name: "a/b".into(),
                ch: '/'
            })
        );
    }

    #[test]
    fn ref_deserialization_validates() {
        let ok: SnapshotRef = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(ok, SnapshotRef::latest());
        assert!(serde_json::from_str::<SnapshotRef>("\"a b\"").is_err());
    }

    #[test]
    fn meta_defaults_schema_version() {
        let meta: SnapshotMeta = serde_json::from_str(r#"{"fingerprint":"abc"}"#).unwrap();
        assert_eq!(meta.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(meta.captured_at.is_none());
    }
}
