//! Raw extractor output.
//!
//! Extractors emit JSON fragments in this shape. Node ids are optional on
//! the wire and derived from `(language, kind, fqname)` when missing, so an
//! extractor only has to agree on names to agree on identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{
    ArchitectureIR, AttrValue, CanonicalId, DepType, IREdge, IRNode, Language, SourceLoc,
    SymbolKind,
};

/// A node as produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Explicit id, for synthetic nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fully-qualified name.
    pub fqname: String,
    /// Element kind.
    pub kind: SymbolKind,
    /// Source language.
    pub language: Language,
    /// Definition site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
    /// Layer hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// Container hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Context hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Extension attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl RawNode {
    /// Converts into an [`IRNode`], deriving the id when absent.
    #[must_use]
    pub fn into_node(self) -> IRNode {
        let id = match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => CanonicalId::from_raw(id),
            _ => CanonicalId::derive(&self.language, &self.kind, &self.fqname),
        };
        IRNode {
            id,
            fqname: self.fqname.trim().to_string(),
            kind: self.kind,
            language: self.language,
            loc: self.loc,
            layer: self.layer,
            container: self.container,
            context: self.context,
            attributes: self.attributes,
        }
    }
}

/// An edge as produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Source node id.
    pub src: String,
    /// Destination node id.
    pub dst: String,
    /// Dependency type.
    pub dep_type: DepType,
    /// Reference site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
}

impl RawEdge {
    /// Converts into an [`IREdge`].
    #[must_use]
    pub fn into_edge(self) -> IREdge {
        IREdge {
            src: CanonicalId::from_raw(self.src.trim()),
            dst: CanonicalId::from_raw(self.dst.trim()),
            dep_type: self.dep_type,
            loc: self.loc,
        }
    }
}

/// One extractor's contribution to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrFragment {
    /// Name of the producing extractor, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// Nodes.
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    /// Edges.
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl IrFragment {
    /// Converts into an unnormalized graph.
    #[must_use]
    pub fn into_ir(self) -> ArchitectureIR {
        ArchitectureIR::new(
            self.nodes.into_iter().map(RawNode::into_node).collect(),
            self.edges.into_iter().map(RawEdge::into_edge).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_missing_ids() {
        let fragment: IrFragment = serde_json::from_str(
            r#"{
                "producer": "py-extractor",
                "nodes": [
                    {"fqname": "app.domain.Order", "kind": "class", "language": "python",
                     "loc": {"file": "app/domain/order.py", "start": {"line": 3, "column": 1}}}
                ],
                "edges": []
            }"#,
        )
        .unwrap();
        let ir = fragment.into_ir();
        assert_eq!(ir.nodes[0].id.as_str(), "python:class:app.domain.Order");
        assert_eq!(ir.nodes[0].file(), Some("app/domain/order.py"));
    }

    #[test]
    fn keeps_explicit_ids() {
        let raw = RawNode {
            id: Some("synthetic:db".into()),
            fqname: "db".into(),
            kind: SymbolKind::Other("resource".into()),
            language: Language::Other("sql".into()),
            loc: None,
            layer: None,
            container: None,
            context: None,
            attributes: BTreeMap::new(),
        };
        assert_eq!(raw.into_node().id.as_str(), "synthetic:db");
    }

    #[test]
    fn blank_id_is_derived() {
        let raw: RawNode = serde_json::from_str(
            r#"{"id": "  ", "fqname": "a", "kind": "module", "language": "rust"}"#,
        )
        .unwrap();
        assert_eq!(raw.into_node().id.as_str(), "rust:module:a");
    }

    #[test]
    fn edges_use_id_strings() {
        let raw: RawEdge = serde_json::from_str(
            r#"{"src": "python:module:a", "dst": "python:module:b", "dep_type": "import"}"#,
        )
        .unwrap();
        let edge = raw.into_edge();
        assert_eq!(edge.dep_type, DepType::Import);
        assert_eq!(edge.dst.as_str(), "python:module:b");
    }
}
