//! Canonical form of an [`ArchitectureIR`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::keys::{dedupe_edges, dedupe_nodes};
use super::types::{ArchitectureIR, CanonicalId, EdgeKey};

/// What to do with edges whose endpoints are not in the node set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingEdges {
    /// Remove them (the default).
    #[default]
    Drop,
    /// Keep them so that validation can report them.
    Keep,
}

/// Options for [`IrNormalizer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Dangling-edge policy.
    pub dangling: DanglingEdges,
}

impl NormalizeOptions {
    /// Keeps dangling edges instead of dropping them.
    #[must_use]
    pub fn keep_dangling() -> Self {
        Self {
            dangling: DanglingEdges::Keep,
        }
    }
}

/// Result of a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The canonical graph.
    pub ir: ArchitectureIR,
    /// Keys of the dangling edges that were dropped.
    pub dropped: Vec<EdgeKey>,
}

/// Re-dedupes, sorts and (by default) prunes dangling edges.
///
/// Idempotent: normalizing a normalized graph returns it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrNormalizer {
    options: NormalizeOptions,
}

impl IrNormalizer {
    /// Creates a normalizer.
    #[must_use]
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalizes `ir`.
    #[must_use]
    pub fn normalize(&self, ir: ArchitectureIR) -> Normalized {
        let mut nodes = dedupe_nodes(ir.nodes);
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let known: HashSet<&CanonicalId> = nodes.iter().map(|n| &n.id).collect();

        let mut dropped = Vec::new();
        let mut edges = Vec::new();
        for edge in dedupe_edges(ir.edges) {
            let dangling = !known.contains(&edge.src) || !known.contains(&edge.dst);
            if dangling && self.options.dangling == DanglingEdges::Drop {
                dropped.push(edge.key());
            } else {
                edges.push(edge);
            }
        }
        edges.sort_by(|a, b| {
            (&a.src, &a.dst, &a.dep_type).cmp(&(&b.src, &b.dst, &b.dep_type))
        });
        dropped.sort();

        if !dropped.is_empty() {
            warn!(count = dropped.len(), "dropped dangling edges");
        }
        debug!(nodes = nodes.len(), edges = edges.len(), "normalized IR");

        Normalized {
            ir: ArchitectureIR::new(nodes, edges),
            dropped,
        }
    }
}

/// Normalizes with default options.
#[must_use]
pub fn normalize(ir: ArchitectureIR) -> ArchitectureIR {
    IrNormalizer::default().normalize(ir).ir
}
