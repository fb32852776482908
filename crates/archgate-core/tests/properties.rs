//! Algebraic properties of the graph pipeline.

use archgate_core::ir::{
    dedupe_edges, dedupe_nodes, node_key, normalize, ArchitectureIR, CanonicalId, DepType,
    IREdge, IRNode, IrMerger, Language, SourceLoc, SymbolKind,
};
use archgate_core::snapshot::{SnapshotBuilder, SnapshotDiffEngine};
use proptest::prelude::*;

const NAMES: &[&str] = &["app", "app.domain", "app.domain.Order", "app.infra", "app.infra.Repo", "lib"];
const DEP_TYPES: &[DepType] = &[DepType::Import, DepType::Call, DepType::Inherit];

fn id_of(i: usize) -> CanonicalId {
    CanonicalId::derive(&Language::Python, &SymbolKind::Module, NAMES[i])
}

// Payload is a function of identity, so any two copies agree where both
// are set. Only presence varies.
fn node_strategy() -> impl Strategy<Value = IRNode> {
    (0..NAMES.len(), any::<bool>(), any::<bool>()).prop_map(|(i, with_layer, with_loc)| {
        let name = NAMES[i];
        let mut node = IRNode::new(Language::Python, SymbolKind::Module, name);
        if with_layer {
            node = node.with_layer(format!("layer{}", i % 3));
        }
        if with_loc {
            node = node.with_loc(SourceLoc::at(format!("{name}.py"), 1, 1));
        }
        node
    })
}

fn edge_strategy() -> impl Strategy<Value = IREdge> {
    (0..NAMES.len(), 0..NAMES.len(), 0..DEP_TYPES.len(), any::<bool>()).prop_map(
        |(s, d, t, with_loc)| {
            let edge = IREdge::new(id_of(s), id_of(d), DEP_TYPES[t].clone());
            if with_loc {
                edge.with_loc(SourceLoc::at(format!("{}.py", NAMES[s]), (d + 1) as u32, 1))
            } else {
                edge
            }
        },
    )
}

fn graph_strategy() -> impl Strategy<Value = ArchitectureIR> {
    (
        prop::collection::vec(node_strategy(), 0..8),
        prop::collection::vec(edge_strategy(), 0..12),
    )
        .prop_map(|(nodes, edges)| ArchitectureIR::new(nodes, edges))
}

proptest! {
    #[test]
    fn normalization_is_idempotent(g in graph_strategy()) {
        let once = normalize(g);
        let twice = normalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_ignores_fragment_order(
        (fragments, shuffled) in prop::collection::vec(graph_strategy(), 1..4)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let merger = IrMerger::new();
        let a = merger.merge(fragments).unwrap();
        let b = merger.merge(shuffled).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn diff_is_symmetric(a in graph_strategy(), b in graph_strategy()) {
        let a = SnapshotBuilder::new().build(a);
        let b = SnapshotBuilder::new().build(b);
        let engine = SnapshotDiffEngine::new();
        let forward = engine.diff(&a, &b, true);
        let backward = engine.diff(&b, &a, true);
        prop_assert_eq!(forward.nodes_added, backward.nodes_removed);
        prop_assert_eq!(forward.nodes_removed, backward.nodes_added);
        prop_assert_eq!(forward.edges_added, backward.edges_removed);
        prop_assert_eq!(forward.edges_removed, backward.edges_added);
        let (f, r) = (forward.details.unwrap(), backward.details.unwrap());
        prop_assert_eq!(f.nodes.added, r.nodes.removed);
        prop_assert_eq!(f.edges.removed, r.edges.added);
    }

    #[test]
    fn node_key_ignores_location(i in 0..NAMES.len(), line in 1u32..500) {
        let plain = IRNode::new(Language::Python, SymbolKind::Module, NAMES[i]);
        let located = plain.clone().with_loc(SourceLoc::at("x.py", line, 1));
        prop_assert_eq!(node_key(&plain), node_key(&located));
    }
}

#[test]
fn dedupe_collapses_identical_records_only() {
    let n = IRNode::new(Language::Go, SymbolKind::Package, "svc");
    assert_eq!(dedupe_nodes([n.clone(), n.clone()]).len(), 1);

    let import = IREdge::new(n.id.clone(), id_of(0), DepType::Import);
    let call = IREdge::new(n.id.clone(), id_of(0), DepType::Call);
    assert_eq!(dedupe_edges([import.clone(), import.clone()]).len(), 1);
    assert_eq!(dedupe_edges([import, call]).len(), 2);
}
