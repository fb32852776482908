//! Merging of raw IR fragments into one graph.

use std::collections::HashMap;

use tracing::debug;

use super::keys::dedupe_edges;
use super::keys::dedupe_nodes;
use super::normalize::{IrNormalizer, NormalizeOptions};
use super::types::{ArchitectureIR, CanonicalId, IRNode};
use crate::error::{ArchError, ArchResult};

/// Combines fragments (typically one per extractor) into a single graph.
///
/// The resulting *set* of nodes and edges does not depend on fragment
/// order. Fragment order only decides which payload wins when two
/// fragments supply different non-empty values for the same field.
#[derive(Debug, Clone, Default)]
pub struct IrMerger {
    normalize: NormalizeOptions,
}

impl IrMerger {
    /// Creates a merger with default normalization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the normalization applied to the merged graph.
    #[must_use]
    pub fn normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Merges fragments and returns the normalized result.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeConflict`](crate::ErrorKind::MergeConflict) error when
    /// two fragments describe the same id with a different kind, language or
    /// fully-qualified name.
    pub fn merge<I>(&self, fragments: I) -> ArchResult<ArchitectureIR>
    where
        I: IntoIterator<Item = ArchitectureIR>,
    {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut fragment_count = 0usize;

        for fragment in fragments {
            fragment_count += 1;
            nodes.extend(fragment.nodes);
            edges.extend(fragment.edges);
        }

        check_identity_conflicts(&nodes)?;

        let raw_nodes = nodes.len();
        let raw_edges = edges.len();
        let merged = ArchitectureIR::new(dedupe_nodes(nodes), dedupe_edges(edges));

        debug!(
            fragments = fragment_count,
            raw_nodes,
            raw_edges,
            nodes = merged.nodes.len(),
            edges = merged.edges.len(),
            "merged IR fragments"
        );

        Ok(IrNormalizer::new(self.normalize).normalize(merged).ir)
    }
}

fn check_identity_conflicts(nodes: &[IRNode]) -> ArchResult<()> {
    let mut first_seen: HashMap<&CanonicalId, &IRNode> = HashMap::new();

    for node in nodes {
        let Some(first) = first_seen.get(&node.id) else {
            first_seen.insert(&node.id, node);
            continue;
        };

        let mismatch = if first.kind != node.kind {
            Some(("kind", first.kind.to_string(), node.kind.to_string()))
        } else if first.language != node.language {
            Some(("language", first.language.to_string(), node.language.to_string()))
        } else if first.fqname != node.fqname {
            Some(("fqname", first.fqname.clone(), node.fqname.clone()))
        } else {
            None
        };

        if let Some((field, a, b)) = mismatch {
            return Err(ArchError::merge_conflict(format!(
                "conflicting {field} for node `{}`: `{a}` vs `{b}`",
                node.id
            ))
            .with_detail("id", node.id.as_str())
            .with_detail("field", field)
            .with_detail("first", a)
            .with_detail("second", b)
            .with_detail("help", "two extractors disagree about this element; check their id scheme"));
        }
    }

    Ok(())
}
