//! Diagnostic checks over a graph.
//!
//! Nothing here is fatal. The issues are meant to be printed or logged so a
//! broken extractor can be spotted before its output reaches the index.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{ArchitectureIR, CanonicalId, EdgeKey};

/// Which optional checks [`validate_ir`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrValidationOptions {
    /// Report edges whose source and destination are the same node.
    pub report_self_loops: bool,
    /// Report nodes/edges that are not in canonical order.
    pub check_order: bool,
}

impl Default for IrValidationOptions {
    fn default() -> Self {
        Self {
            report_self_loops: false,
            check_order: true,
        }
    }
}

/// One problem found by [`validate_ir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IrIssue {
    /// The same node id appears more than once.
    DuplicateNode {
        /// Offending id.
        id: CanonicalId,
    },
    /// The same edge triple appears more than once.
    DuplicateEdge {
        /// Offending edge.
        edge: EdgeKey,
    },
    /// An edge endpoint is not in the node set.
    DanglingEdge {
        /// Offending edge.
        edge: EdgeKey,
        /// The missing endpoint.
        missing: CanonicalId,
    },
    /// An edge points at its own source.
    SelfLoop {
        /// Offending edge.
        edge: EdgeKey,
    },
    /// Nodes are not sorted by id.
    UnsortedNodes,
    /// Edges are not sorted by triple.
    UnsortedEdges,
}

impl fmt::Display for IrIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { id } => write!(f, "duplicate node id `{id}`"),
            Self::DuplicateEdge { edge } => write!(f, "duplicate edge {edge}"),
            Self::DanglingEdge { edge, missing } => {
                write!(f, "edge {edge} references unknown node `{missing}`")
            }
            Self::SelfLoop { edge } => write!(f, "self-loop {edge}"),
            Self::UnsortedNodes => f.write_str("nodes are not in canonical order"),
            Self::UnsortedEdges => f.write_str("edges are not in canonical order"),
        }
    }
}

/// Checks `ir` and returns every issue found, in a deterministic order.
#[must_use]
pub fn validate_ir(ir: &ArchitectureIR, options: IrValidationOptions) -> Vec<IrIssue> {
    let mut issues = Vec::new();

    let mut ids = HashSet::new();
    for node in &ir.nodes {
        if !ids.insert(&node.id) {
            issues.push(IrIssue::DuplicateNode {
                id: node.id.clone(),
            });
        }
    }

    let mut triples = HashSet::new();
    for edge in &ir.edges {
        let key = edge.key();
        for endpoint in [&edge.src, &edge.dst] {
            if !ids.contains(endpoint) {
                issues.push(IrIssue::DanglingEdge {
                    edge: key.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        if options.report_self_loops && edge.src == edge.dst {
            issues.push(IrIssue::SelfLoop { edge: key.clone() });
        }
        if !triples.insert(key.clone()) {
            issues.push(IrIssue::DuplicateEdge { edge: key });
        }
    }

    if options.check_order {
        if ir.nodes.windows(2).any(|w| w[0].id > w[1].id) {
            issues.push(IrIssue::UnsortedNodes);
        }
        if ir.edges.windows(2).any(|w| w[0].key() > w[1].key()) {
            issues.push(IrIssue::UnsortedEdges);
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::normalize::normalize;
    use crate::ir::types::{DepType, IREdge, IRNode, Language, SymbolKind};

    fn node(fqname: &str) -> IRNode {
        IRNode::new(Language::Go, SymbolKind::Package, fqname)
    }

    #[test]
    fn normalized_graph_is_clean() {
        let a = node("a");
        let b = node("b");
        let ir = normalize(ArchitectureIR::new(
            vec![b.clone(), a.clone()],
            vec![IREdge::new(a.id, b.id, DepType::Import)],
        ));
        assert!(validate_ir(&ir, IrValidationOptions::default()).is_empty());
    }

    #[test]
    fn reports_every_issue_kind() {
        let a = node("a");
        let b = node("b");
        let ir = ArchitectureIR::new(
            vec![b.clone(), a.clone(), a.clone()],
            vec![
                IREdge::new(b.id.clone(), a.id.clone(), DepType::Import),
                IREdge::new(a.id.clone(), a.id.clone(), DepType::Call),
                IREdge::new(a.id.clone(), a.id.clone(), DepType::Call),
                IREdge::new(a.id.clone(), CanonicalId::from("go:package:x"), DepType::Import),
            ],
        );
        let issues = validate_ir(
            &ir,
            IrValidationOptions {
                report_self_loops: true,
                check_order: true,
            },
        );

        assert!(issues.contains(&IrIssue::DuplicateNode { id: a.id.clone() }));
        assert!(issues.iter().any(|i| matches!(i, IrIssue::DuplicateEdge { .. })));
        assert!(issues.iter().any(|i| matches!(i, IrIssue::DanglingEdge { .. })));
        assert!(issues.iter().any(|i| matches!(i, IrIssue::SelfLoop { .. })));
        assert!(issues.contains(&IrIssue::UnsortedNodes));
        assert!(issues.contains(&IrIssue::UnsortedEdges));
    }

    #[test]
    fn self_loops_are_opt_in() {
        let a = node("a");
        let ir = ArchitectureIR::new(
            vec![a.clone()],
            vec![IREdge::new(a.id.clone(), a.id, DepType::Call)],
        );
        assert!(validate_ir(&ir, IrValidationOptions::default()).is_empty());
    }
}
