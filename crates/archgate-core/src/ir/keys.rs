//! Identity keys and deduplication.
//!
//! Keys are pure functions of a node or edge. Deduplication keeps the first
//! occurrence of every key (preserving input order) and folds later
//! occurrences into it with [`reconcile_node`] / [`reconcile_edge`].

use std::collections::HashMap;

use super::types::{CanonicalId, EdgeKey, IREdge, IRNode, SourceLoc};

/// Returns the identity of a node.
#[must_use]
pub fn node_key(node: &IRNode) -> CanonicalId {
    node.id.clone()
}

/// Returns the identity triple of an edge.
#[must_use]
pub fn edge_key(edge: &IREdge) -> EdgeKey {
    edge.key()
}

/// Deduplicates nodes by [`node_key`], keeping first-occurrence order.
///
/// Identity fields of later duplicates are ignored; detecting contradictory
/// identity is the job of the merger.
#[must_use]
pub fn dedupe_nodes(nodes: impl IntoIterator<Item = IRNode>) -> Vec<IRNode> {
    let mut out: Vec<IRNode> = Vec::new();
    let mut seen: HashMap<CanonicalId, usize> = HashMap::new();

    for node in nodes {
        match seen.get(&node.id) {
            Some(&i) => reconcile_node(&mut out[i], node),
            None => {
                seen.insert(node_key(&node), out.len());
                out.push(node);
            }
        }
    }

    out
}

/// Deduplicates edges by [`edge_key`], keeping first-occurrence order.
///
/// Edges that differ only in dependency type are distinct and both kept.
#[must_use]
pub fn dedupe_edges(edges: impl IntoIterator<Item = IREdge>) -> Vec<IREdge> {
    let mut out: Vec<IREdge> = Vec::new();
    let mut seen: HashMap<EdgeKey, usize> = HashMap::new();

    for edge in edges {
        let key = edge_key(&edge);
        match seen.get(&key) {
            Some(&i) => reconcile_edge(&mut out[i], edge),
            None => {
                seen.insert(key, out.len());
                out.push(edge);
            }
        }
    }

    out
}

/// Folds `other` into `kept`: empty payload fields are filled from `other`,
/// non-empty ones stay as they are. Attributes are unioned, first wins.
pub fn reconcile_node(kept: &mut IRNode, other: IRNode) {
    fill_loc(&mut kept.loc, other.loc);
    fill(&mut kept.layer, other.layer);
    fill(&mut kept.container, other.container);
    fill(&mut kept.context, other.context);
    for (key, value) in other.attributes {
        kept.attributes.entry(key).or_insert(value);
    }
}

/// Folds `other` into `kept`: a non-empty location wins over an empty one.
pub fn reconcile_edge(kept: &mut IREdge, other: IREdge) {
    fill_loc(&mut kept.loc, other.loc);
}

fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    let empty = slot.as_deref().map_or(true, str::is_empty);
    if empty {
        if let Some(value) = candidate.filter(|v| !v.is_empty()) {
            *slot = Some(value);
        }
    }
}

fn fill_loc(slot: &mut Option<SourceLoc>, candidate: Option<SourceLoc>) {
    let empty = slot.as_ref().map_or(true, SourceLoc::is_empty);
    if empty {
        if let Some(loc) = candidate.filter(|l| !l.is_empty()) {
            *slot = Some(loc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{DepType, Language, SymbolKind};

    fn class(fqname: &str) -> IRNode {
        IRNode::new(Language::Python, SymbolKind::Class, fqname)
    }

    #[test]
    fn node_key_ignores_location() {
        let a = class("app.Order").with_loc(SourceLoc::at("app/order.py", 10, 1));
        let b = class("app.Order").with_loc(SourceLoc::at("app/order.py", 42, 5));
        assert_eq!(node_key(&a), node_key(&b));
    }

    #[test]
    fn dedupe_identical_nodes_yields_one() {
        let n = class("app.Order");
        let out = dedupe_nodes(vec![n.clone(), n]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn dedupe_prefers_complete_payload() {
        let bare = class("app.Order");
        let rich = class("app.Order")
            .with_loc(SourceLoc::file("app/order.py"))
            .with_layer("domain");
        let out = dedupe_nodes(vec![bare, rich]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].layer.as_deref(), Some("domain"));
        assert_eq!(out[0].file(), Some("app/order.py"));
    }

    #[test]
    fn dedupe_tie_keeps_first() {
        let first = class("app.Order").with_layer("domain");
        let second = class("app.Order").with_layer("application");
        let out = dedupe_nodes(vec![first, second]);
        assert_eq!(out[0].layer.as_deref(), Some("domain"));
    }

    #[test]
    fn dedupe_unions_attributes_first_wins() {
        let a = class("app.Order").with_attribute("team", "core");
        let b = class("app.Order")
            .with_attribute("team", "billing")
            .with_attribute("public", true);
        let out = dedupe_nodes(vec![a, b]);
        assert_eq!(out[0].attributes.len(), 2);
        assert_eq!(out[0].attributes["team"].to_string(), "core");
    }

    #[test]
    fn dedupe_edges_collapses_identical_triples() {
        let a = class("a.A").id;
        let b = class("b.B").id;
        let e = IREdge::new(a, b, DepType::Call);
        assert_eq!(dedupe_edges(vec![e.clone(), e]).len(), 1);
    }

    #[test]
    fn dedupe_edges_keeps_distinct_dep_types() {
        let a = class("a.A").id;
        let b = class("b.B").id;
        let out = dedupe_edges(vec![
            IREdge::new(a.clone(), b.clone(), DepType::Call),
            IREdge::new(a, b, DepType::Import),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn dedupe_edges_prefers_located_edge() {
        let a = class("a.A").id;
        let b = class("b.B").id;
        let out = dedupe_edges(vec![
            IREdge::new(a.clone(), b.clone(), DepType::Call),
            IREdge::new(a, b, DepType::Call).with_loc(SourceLoc::at("a.py", 3, 1)),
        ]);
        assert_eq!(out[0].loc, Some(SourceLoc::at("a.py", 3, 1)));
    }
}
