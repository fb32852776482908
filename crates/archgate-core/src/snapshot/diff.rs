//! Structural diff between two snapshots.
//!
//! Nodes are matched by id and edges by `(src, dst, dep_type)`. An element
//! present on both sides whose payload differs is reported as changed, with
//! the differing fields listed when details are requested.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::Snapshot;
use crate::ir::{ArchitectureIR, CanonicalId, EdgeKey, IREdge, IRNode, SourceLoc};

/// One payload field that differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name (`layer`, `loc`, `attr.<key>`, ...).
    pub field: String,
    /// Value before, if set.
    pub before: Option<String>,
    /// Value after, if set.
    pub after: Option<String>,
}

/// A node present on both sides with a different payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChange {
    /// Node id.
    pub id: CanonicalId,
    /// What differs.
    pub fields: Vec<FieldChange>,
}

/// An edge present on both sides with a different payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeChange {
    /// Edge identity.
    pub edge: EdgeKey,
    /// What differs.
    pub fields: Vec<FieldChange>,
}

/// Itemized node delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDiff {
    /// Ids only in `after`.
    pub added: Vec<CanonicalId>,
    /// Ids only in `before`.
    pub removed: Vec<CanonicalId>,
    /// Ids in both with differing payload.
    pub changed: Vec<NodeChange>,
}

/// Itemized edge delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDiff {
    /// Triples only in `after`.
    pub added: Vec<EdgeKey>,
    /// Triples only in `before`.
    pub removed: Vec<EdgeKey>,
    /// Triples in both with differing payload.
    pub changed: Vec<EdgeChange>,
}

/// Itemized delta, present when details were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffDetails {
    /// Node delta.
    pub nodes: NodeDiff,
    /// Edge delta.
    pub edges: EdgeDiff,
}

/// Difference between two snapshots, `before` to `after`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    /// Nodes only in `after`.
    pub nodes_added: usize,
    /// Nodes only in `before`.
    pub nodes_removed: usize,
    /// Nodes in both with differing payload.
    pub nodes_changed: usize,
    /// Edges only in `after`.
    pub edges_added: usize,
    /// Edges only in `before`.
    pub edges_removed: usize,
    /// Edges in both with differing payload.
    pub edges_changed: usize,
    /// Itemized sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DiffDetails>,
}

impl SnapshotDiff {
    /// `true` when nothing was added, removed or changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes_added == 0
            && self.nodes_removed == 0
            && self.nodes_changed == 0
            && self.edges_added == 0
            && self.edges_removed == 0
            && self.edges_changed == 0
    }
}

/// Computes [`SnapshotDiff`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffEngine;

impl SnapshotDiffEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Diffs two snapshots. Equal fingerprints short-circuit to an empty
    /// diff.
    #[must_use]
    pub fn diff(&self, before: &Snapshot, after: &Snapshot, include_details: bool) -> SnapshotDiff {
        if before.meta.fingerprint == after.meta.fingerprint {
            debug!(fingerprint = %before.meta.fingerprint, "snapshots identical");
            return SnapshotDiff {
                details: include_details.then(DiffDetails::default),
                ..SnapshotDiff::default()
            };
        }
        self.diff_parts(
            &before.nodes,
            &before.edges,
            &after.nodes,
            &after.edges,
            include_details,
        )
    }

    /// Diffs two graphs.
    #[must_use]
    pub fn diff_ir(
        &self,
        before: &ArchitectureIR,
        after: &ArchitectureIR,
        include_details: bool,
    ) -> SnapshotDiff {
        self.diff_parts(
            &before.nodes,
            &before.edges,
            &after.nodes,
            &after.edges,
            include_details,
        )
    }

    fn diff_parts(
        &self,
        before_nodes: &[IRNode],
        before_edges: &[IREdge],
        after_nodes: &[IRNode],
        after_edges: &[IREdge],
        include_details: bool,
    ) -> SnapshotDiff {
        let nodes = diff_by_key(before_nodes, after_nodes, |n| n.id.clone(), node_changes);
        let edges = diff_by_key(before_edges, after_edges, IREdge::key, edge_changes);

        let diff = SnapshotDiff {
            nodes_added: nodes.added.len(),
            nodes_removed: nodes.removed.len(),
            nodes_changed: nodes.changed.len(),
            edges_added: edges.added.len(),
            edges_removed: edges.removed.len(),
            edges_changed: edges.changed.len(),
            details: include_details.then(|| DiffDetails {
                nodes: NodeDiff {
                    added: nodes.added,
                    removed: nodes.removed,
                    changed: nodes
                        .changed
                        .into_iter()
                        .map(|(id, fields)| NodeChange { id, fields })
                        .collect(),
                },
                edges: EdgeDiff {
                    added: edges.added,
                    removed: edges.removed,
                    changed: edges
                        .changed
                        .into_iter()
                        .map(|(edge, fields)| EdgeChange { edge, fields })
                        .collect(),
                },
            }),
        };
        debug!(
            nodes_added = diff.nodes_added,
            nodes_removed = diff.nodes_removed,
            edges_added = diff.edges_added,
            edges_removed = diff.edges_removed,
            "computed snapshot diff"
        );
        diff
    }
}

struct Delta<K> {
    added: Vec<K>,
    removed: Vec<K>,
    changed: Vec<(K, Vec<FieldChange>)>,
}

fn diff_by_key<T, K, F, C>(before: &[T], after: &[T], key: F, changes: C) -> Delta<K>
where
    K: Ord + Clone,
    F: Fn(&T) -> K,
    C: Fn(&T, &T) -> Vec<FieldChange>,
{
    let before: BTreeMap<K, &T> = before.iter().map(|t| (key(t), t)).collect();
    let after: BTreeMap<K, &T> = after.iter().map(|t| (key(t), t)).collect();

    let mut delta = Delta {
        added: Vec::new(),
        removed: Vec::new(),
        changed: Vec::new(),
    };
    for (k, old) in &before {
        match after.get(k) {
            None => delta.removed.push(k.clone()),
            Some(new) => {
                let fields = changes(old, new);
                if !fields.is_empty() {
                    delta.changed.push((k.clone(), fields));
                }
            }
        }
    }
    delta.added = after
        .keys()
        .filter(|k| !before.contains_key(*k))
        .cloned()
        .collect();
    delta
}

fn push_change(out: &mut Vec<FieldChange>, field: &str, before: Option<String>, after: Option<String>) {
    if before != after {
        out.push(FieldChange {
            field: field.to_string(),
            before,
            after,
        });
    }
}

/// Locations are compared structurally; the text is only for display.
fn push_loc_change(out: &mut Vec<FieldChange>, before: Option<&SourceLoc>, after: Option<&SourceLoc>) {
    if before != after {
        out.push(FieldChange {
            field: "loc".to_string(),
            before: before.map(ToString::to_string),
            after: after.map(ToString::to_string),
        });
    }
}

fn node_changes(before: &IRNode, after: &IRNode) -> Vec<FieldChange> {
    let mut out = Vec::new();
    push_change(&mut out, "fqname", Some(before.fqname.clone()), Some(after.fqname.clone()));
    push_change(&mut out, "kind", Some(before.kind.to_string()), Some(after.kind.to_string()));
    push_change(
        &mut out,
        "language",
        Some(before.language.to_string()),
        Some(after.language.to_string()),
    );
    push_loc_change(&mut out, before.loc.as_ref(), after.loc.as_ref());
    push_change(&mut out, "layer", before.layer.clone(), after.layer.clone());
    push_change(&mut out, "container", before.container.clone(), after.container.clone());
    push_change(&mut out, "context", before.context.clone(), after.context.clone());

    let keys: std::collections::BTreeSet<&String> = before
        .attributes
        .keys()
        .chain(after.attributes.keys())
        .collect();
    for key in keys {
        push_change(
            &mut out,
            &format!("attr.{key}"),
            before.attributes.get(key).map(ToString::to_string),
            after.attributes.get(key).map(ToString::to_string),
        );
    }
    out
}

fn edge_changes(before: &IREdge, after: &IREdge) -> Vec<FieldChange> {
    let mut out = Vec::new();
    push_loc_change(&mut out, before.loc.as_ref(), after.loc.as_ref());
    out
}
