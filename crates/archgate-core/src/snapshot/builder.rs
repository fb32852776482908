//! Assembles [`Snapshot`] values.

use chrono::{DateTime, Utc};

use super::types::{Snapshot, SnapshotMeta, SNAPSHOT_SCHEMA_VERSION};
use crate::ir::{ArchitectureIR, IrNormalizer, NormalizeOptions};
use crate::violation::Violation;

/// Builder for [`Snapshot`].
///
/// The core never reads the clock; callers that want a capture time pass it
/// in with [`SnapshotBuilder::captured_at`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SnapshotBuilder {
    repo_root: Option<String>,
    tool_version: Option<String>,
    captured_at: Option<DateTime<Utc>>,
    violations: Option<Vec<Violation>>,
}

impl SnapshotBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the repository root.
    pub fn repo_root(mut self, root: impl Into<String>) -> Self {
        self.repo_root = Some(root.into());
        self
    }

    /// Records the tool version.
    pub fn tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }

    /// Records the capture time.
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Attaches a violation set, turning the snapshot into a baseline.
    pub fn violations(mut self, mut violations: Vec<Violation>) -> Self {
        violations.sort_by(|a, b| a.key.cmp(&b.key));
        violations.dedup_by(|a, b| a.key == b.key);
        self.violations = Some(violations);
        self
    }

    /// Builds the snapshot.
    ///
    /// The graph is brought into canonical order; dangling edges the caller
    /// chose to keep are kept.
    #[must_use]
    pub fn build(self, ir: ArchitectureIR) -> Snapshot {
        let ir = IrNormalizer::new(NormalizeOptions::keep_dangling())
            .normalize(ir)
            .ir;
        Snapshot {
            meta: SnapshotMeta {
                schema_version: SNAPSHOT_SCHEMA_VERSION,
                repo_root: self.repo_root,
                tool_version: self.tool_version,
                captured_at: self.captured_at,
                fingerprint: ir.fingerprint(),
            },
            nodes: ir.nodes,
            edges: ir.edges,
            violations: self.violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DepType, IREdge, IRNode, Language, SymbolKind};

    fn unsorted() -> ArchitectureIR {
        let b = IRNode::new(Language::Rust, SymbolKind::Module, "b");
        let a = IRNode::new(Language::Rust, SymbolKind::Module, "a");
        ArchitectureIR::new(
            vec![b.clone(), a.clone()],
            vec![IREdge::new(b.id, a.id, DepType::Use)],
        )
    }

    #[test]
    fn builds_canonical_snapshot() {
        let snap = SnapshotBuilder::new()
            .repo_root("/repo")
            .tool_version("0.3.0")
            .build(unsorted());
        assert_eq!(snap.nodes[0].fqname, "a");
        assert_eq!(snap.meta.repo_root.as_deref(), Some("/repo"));
        assert!(snap.verify_fingerprint());
        assert!(snap.violations.is_none());
    }

    #[test]
    fn fingerprint_ignores_input_order() {
        let mut reversed = unsorted();
        reversed.nodes.reverse();
        let first = SnapshotBuilder::new().build(unsorted());
        let second = SnapshotBuilder::new().build(reversed);
        assert_eq!(first.meta.fingerprint, second.meta.fingerprint);
    }

    #[test]
    fn keeps_dangling_edges() {
        let mut ir = unsorted();
        ir.nodes.truncate(1);
        let snap = SnapshotBuilder::new().build(ir);
        assert_eq!(snap.edges.len(), 1);
    }
}
