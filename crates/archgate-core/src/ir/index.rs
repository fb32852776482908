//! Read-only lookup structures over a normalized graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{ArchitectureIR, CanonicalId, IREdge, IRNode, SymbolKind};
use crate::error::{ArchError, ArchResult};

/// Lookup tables borrowed from an [`ArchitectureIR`].
///
/// The index holds references only. If the graph changes, build a new index;
/// there is no way to patch one.
#[derive(Debug, Clone)]
pub struct IRIndex<'a> {
    ir: &'a ArchitectureIR,
    by_id: HashMap<&'a CanonicalId, usize>,
    outgoing: HashMap<&'a CanonicalId, Vec<usize>>,
    incoming: HashMap<&'a CanonicalId, Vec<usize>>,
    by_layer: BTreeMap<&'a str, Vec<usize>>,
    by_kind: HashMap<&'a SymbolKind, Vec<usize>>,
}

/// Builds an index over `ir`.
///
/// # Errors
///
/// Returns an [`IndexContract`](crate::ErrorKind::IndexContract) error if the
/// graph contains duplicate node ids or duplicate edge triples, which means
/// it was not normalized.
pub fn build_index(ir: &ArchitectureIR) -> ArchResult<IRIndex<'_>> {
    IRIndex::build(ir)
}

impl<'a> IRIndex<'a> {
    /// See [`build_index`].
    ///
    /// # Errors
    ///
    /// Fails on duplicate node ids or edge triples.
    pub fn build(ir: &'a ArchitectureIR) -> ArchResult<Self> {
        let mut by_id = HashMap::with_capacity(ir.nodes.len());
        let mut by_layer: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_kind: HashMap<&SymbolKind, Vec<usize>> = HashMap::new();

        for (i, node) in ir.nodes.iter().enumerate() {
            if by_id.insert(&node.id, i).is_some() {
                return Err(ArchError::index_contract(format!(
                    "duplicate node id `{}` reached the indexer",
                    node.id
                ))
                .with_detail("id", node.id.as_str())
                .with_detail("help", "normalize the graph before indexing it"));
            }
            if let Some(layer) = node.layer.as_deref() {
                by_layer.entry(layer).or_default().push(i);
            }
            by_kind.entry(&node.kind).or_default().push(i);
        }

        let mut outgoing: HashMap<&CanonicalId, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<&CanonicalId, Vec<usize>> = HashMap::new();
        let mut seen = HashSet::with_capacity(ir.edges.len());

        for (i, edge) in ir.edges.iter().enumerate() {
            if !seen.insert((&edge.src, &edge.dst, &edge.dep_type)) {
                return Err(ArchError::index_contract(format!(
                    "duplicate edge {} reached the indexer",
                    edge.key()
                ))
                .with_detail("src", edge.src.as_str())
                .with_detail("dst", edge.dst.as_str())
                .with_detail("dep_type", edge.dep_type.as_str()));
            }
            outgoing.entry(&edge.src).or_default().push(i);
            incoming.entry(&edge.dst).or_default().push(i);
        }

        Ok(Self {
            ir,
            by_id,
            outgoing,
            incoming,
            by_layer,
            by_kind,
        })
    }

    /// Returns the indexed graph.
    #[must_use]
    pub fn ir(&self) -> &'a ArchitectureIR {
        self.ir
    }

    /// All nodes in canonical order.
    #[must_use]
    pub fn nodes(&self) -> &'a [IRNode] {
        &self.ir.nodes
    }

    /// All edges in canonical order.
    #[must_use]
    pub fn edges(&self) -> &'a [IREdge] {
        &self.ir.edges
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &CanonicalId) -> Option<&'a IRNode> {
        self.by_id.get(id).map(|&i| &self.ir.nodes[i])
    }

    /// Returns true if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Edges leaving `id`.
    pub fn outgoing(&self, id: &CanonicalId) -> impl Iterator<Item = &'a IREdge> + '_ {
        self.edge_list(self.outgoing.get(id))
    }

    /// Edges arriving at `id`.
    pub fn incoming(&self, id: &CanonicalId) -> impl Iterator<Item = &'a IREdge> + '_ {
        self.edge_list(self.incoming.get(id))
    }

    /// Nodes assigned to `layer`.
    pub fn nodes_in_layer(&self, layer: &str) -> impl Iterator<Item = &'a IRNode> + '_ {
        self.node_list(self.by_layer.get(layer))
    }

    /// Nodes of the given kind.
    pub fn nodes_of_kind(&self, kind: &SymbolKind) -> impl Iterator<Item = &'a IRNode> + '_ {
        self.node_list(self.by_kind.get(kind))
    }

    /// Resolves both endpoints of an edge. `None` if either is missing.
    #[must_use]
    pub fn edge_endpoints(&self, edge: &IREdge) -> Option<(&'a IRNode, &'a IRNode)> {
        Some((self.node(&edge.src)?, self.node(&edge.dst)?))
    }

    fn edge_list<'s>(&'s self, list: Option<&'s Vec<usize>>) -> impl Iterator<Item = &'a IREdge> + 's {
        let edges = &self.ir.edges;
        list.into_iter().flatten().map(move |&i| &edges[i])
    }

    fn node_list<'s>(&'s self, list: Option<&'s Vec<usize>>) -> impl Iterator<Item = &'a IRNode> + 's {
        let nodes = &self.ir.nodes;
        list.into_iter().flatten().map(move |&i| &nodes[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ir::normalize::normalize;
    use crate::ir::types::{DepType, Language};

    fn graph() -> ArchitectureIR {
        let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.OrderService")
            .with_layer("domain");
        let repo = IRNode::new(Language::Python, SymbolKind::Class, "app.OrderRepo")
            .with_layer("infrastructure");
        let util = IRNode::new(Language::Python, SymbolKind::Function, "app.util.slug");
        normalize(ArchitectureIR::new(
            vec![svc.clone(), repo.clone(), util.clone()],
            vec![
                IREdge::new(svc.id.clone(), repo.id.clone(), DepType::Call),
                IREdge::new(svc.id.clone(), util.id.clone(), DepType::Call),
                IREdge::new(repo.id, util.id, DepType::Import),
            ],
        ))
    }

    #[test]
    fn adjacency() {
        let ir = graph();
        let index = build_index(&ir).unwrap();
        let svc = CanonicalId::from("python:class:app.OrderService");
        let util = CanonicalId::from("python:function:app.util.slug");

        assert_eq!(index.outgoing(&svc).count(), 2);
        assert_eq!(index.incoming(&svc).count(), 0);
        assert_eq!(index.incoming(&util).count(), 2);
        assert_eq!(index.node(&util).map(IRNode::name), Some("slug"));
    }

    #[test]
    fn field_lookups() {
        let ir = graph();
        let index = build_index(&ir).unwrap();
        let domain: Vec<_> = index.nodes_in_layer("domain").map(|n| n.name()).collect();
        assert_eq!(domain, ["OrderService"]);
        assert_eq!(index.nodes_of_kind(&SymbolKind::Class).count(), 2);
        assert_eq!(index.nodes_in_layer("presentation").count(), 0);
    }

    #[test]
    fn edge_endpoints_resolve() {
        let ir = graph();
        let index = build_index(&ir).unwrap();
        let (src, dst) = index.edge_endpoints(&ir.edges[0]).unwrap();
        assert_eq!(src.id, ir.edges[0].src);
        assert_eq!(dst.id, ir.edges[0].dst);
    }

    #[test]
    fn duplicate_ids_violate_contract() {
        let n = IRNode::new(Language::Rust, SymbolKind::Module, "crate::a");
        let ir = ArchitectureIR::new(vec![n.clone(), n], vec![]);
        let err = build_index(&ir).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexContract);
        assert!(err.is_fatal());
    }

    #[test]
    fn duplicate_edges_violate_contract() {
        let a = IRNode::new(Language::Rust, SymbolKind::Module, "crate::a");
        let e = IREdge::new(a.id.clone(), a.id.clone(), DepType::Use);
        let ir = ArchitectureIR::new(vec![a], vec![e.clone(), e]);
        assert!(build_index(&ir).is_err());
    }
}
