//! Core IR types: nodes, edges and the graph that holds them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ────────────────────────────────────────────
// Open enumerations
// ────────────────────────────────────────────

/// Declares a lowercase string-backed enum whose unknown values survive
/// a round trip as `Other`.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Any value outside the known set, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Returns the canonical lowercase spelling.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $text, )+
                    Self::Other(s) => s,
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                let s = s.trim();
                match s.to_ascii_lowercase().as_str() {
                    $( $text => Self::$variant, )+
                    _ => Self::Other(s.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from(s.as_str())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// Kind of code element a node represents.
    pub enum SymbolKind {
        /// A module (Python module, Rust module, ...).
        Module => "module",
        /// A package or namespace.
        Package => "package",
        /// A source file.
        File => "file",
        /// A class.
        Class => "class",
        /// An interface.
        Interface => "interface",
        /// A struct.
        Struct => "struct",
        /// An enum.
        Enum => "enum",
        /// A trait.
        Trait => "trait",
        /// A free function.
        Function => "function",
        /// A method.
        Method => "method",
        /// A variable.
        Variable => "variable",
        /// A constant.
        Constant => "constant",
    }
}

open_enum! {
    /// Source language of a code element.
    pub enum Language {
        /// Python.
        Python => "python",
        /// Rust.
        Rust => "rust",
        /// Java.
        Java => "java",
        /// Kotlin.
        Kotlin => "kotlin",
        /// TypeScript.
        TypeScript => "typescript",
        /// JavaScript.
        JavaScript => "javascript",
        /// Go.
        Go => "go",
        /// C#.
        CSharp => "csharp",
    }
}

open_enum! {
    /// Classification of a dependency edge.
    pub enum DepType {
        /// Module/package import.
        Import => "import",
        /// Function or method call.
        Call => "call",
        /// Class inheritance.
        Inherit => "inherit",
        /// Interface/trait implementation.
        Implement => "implement",
        /// Object construction.
        Instantiate => "instantiate",
        /// Generic usage.
        Use => "use",
        /// Type or symbol reference.
        Reference => "reference",
        /// Structural containment.
        Contain => "contain",
    }
}

// ────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────

/// Stable identity of a code element.
///
/// Derived from language, kind and fully-qualified name so that independent
/// extractors (or separate runs) describing the same element agree on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Derives the canonical id for an element.
    #[must_use]
    pub fn derive(language: &Language, kind: &SymbolKind, fqname: &str) -> Self {
        Self(format!("{language}:{kind}:{}", fqname.trim()))
    }

    /// Wraps an explicit id supplied by an extractor.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ────────────────────────────────────────────
// Payload types
// ────────────────────────────────────────────

/// A position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// Best-effort source location of a node or reference site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    /// File path relative to the repository root.
    pub file: String,
    /// Start position, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<SourcePos>,
    /// End position, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<SourcePos>,
}

impl SourceLoc {
    /// Creates a file-only location.
    #[must_use]
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            start: None,
            end: None,
        }
    }

    /// Creates a location at `line:column`.
    #[must_use]
    pub fn at(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            start: Some(SourcePos { line, column }),
            end: None,
        }
    }

    /// A location without a file carries no information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file, start.line, start.column, end.line, end.column
            ),
            (Some(start), None) => write!(f, "{}:{}:{}", self.file, start.line, start.column),
            (None, _) => f.write_str(&self.file),
        }
    }
}

/// Value stored in a node's open attribute map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean attribute.
    Bool(bool),
    /// Integer attribute.
    Int(i64),
    /// String attribute.
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ────────────────────────────────────────────
// Nodes and edges
// ────────────────────────────────────────────

/// One code element.
///
/// Identity is [`IRNode::id`] alone; every other field is payload that
/// fragments may disagree on and merge reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IRNode {
    /// Canonical identity.
    pub id: CanonicalId,
    /// Fully-qualified name (e.g. `app.domain.OrderService`).
    pub fqname: String,
    /// Element kind.
    pub kind: SymbolKind,
    /// Source language.
    pub language: Language,
    /// Where the element is defined, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
    /// Resolved architecture layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// Resolved container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Resolved bounded context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Open attribute map for extensions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl IRNode {
    /// Creates a node, deriving its canonical id.
    #[must_use]
    pub fn new(language: Language, kind: SymbolKind, fqname: impl Into<String>) -> Self {
        let fqname = fqname.into();
        Self {
            id: CanonicalId::derive(&language, &kind, &fqname),
            fqname,
            kind,
            language,
            loc: None,
            layer: None,
            container: None,
            context: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_loc(mut self, loc: SourceLoc) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Sets the layer.
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Sets the container.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the last segment of the fully-qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.fqname
            .rsplit(|c: char| c == '.' || c == ':' || c == '/')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.fqname)
    }

    /// Returns the file of the source location, if any.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.loc.as_ref().map(|l| l.file.as_str())
    }
}

/// Identity of an edge: the ordered `(src, dst, dep_type)` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node.
    pub src: CanonicalId,
    /// Destination node.
    pub dst: CanonicalId,
    /// Dependency type.
    pub dep_type: DepType,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.src, self.dst, self.dep_type)
    }
}

/// One dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IREdge {
    /// Depending node.
    pub src: CanonicalId,
    /// Depended-upon node.
    pub dst: CanonicalId,
    /// Dependency classification.
    pub dep_type: DepType,
    /// Reference site, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
}

impl IREdge {
    /// Creates an edge without a location.
    #[must_use]
    pub fn new(src: CanonicalId, dst: CanonicalId, dep_type: DepType) -> Self {
        Self {
            src,
            dst,
            dep_type,
            loc: None,
        }
    }

    /// Sets the reference site.
    #[must_use]
    pub fn with_loc(mut self, loc: SourceLoc) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Returns the identity triple of this edge.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            src: self.src.clone(),
            dst: self.dst.clone(),
            dep_type: self.dep_type.clone(),
        }
    }
}

// ────────────────────────────────────────────
// Graph
// ────────────────────────────────────────────

/// The architecture graph.
///
/// Cycles are valid data. After normalization, nodes are unique and sorted
/// by id, and edges are unique and sorted by `(src, dst, dep_type)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureIR {
    /// Code elements.
    #[serde(default)]
    pub nodes: Vec<IRNode>,
    /// Dependencies between them.
    #[serde(default)]
    pub edges: Vec<IREdge>,
}

impl ArchitectureIR {
    /// Creates a graph from raw parts (not normalized).
    #[must_use]
    pub fn new(nodes: Vec<IRNode>, edges: Vec<IREdge>) -> Self {
        Self { nodes, edges }
    }

    /// Returns true if the graph has neither nodes nor edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Content fingerprint (blake3, hex) over nodes and edges in their
    /// current order. Only meaningful for normalized graphs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for node in &self.nodes {
            feed(&mut hasher, "node");
            feed(&mut hasher, node.id.as_str());
            feed(&mut hasher, &node.fqname);
            feed(&mut hasher, node.kind.as_str());
            feed(&mut hasher, node.language.as_str());
            feed_loc(&mut hasher, node.loc.as_ref());
            feed_opt(&mut hasher, node.layer.as_deref());
            feed_opt(&mut hasher, node.container.as_deref());
            feed_opt(&mut hasher, node.context.as_deref());
            for (key, value) in &node.attributes {
                let tag = match value {
                    AttrValue::Bool(_) => "b",
                    AttrValue::Int(_) => "i",
                    AttrValue::Str(_) => "s",
                };
                feed(&mut hasher, key);
                feed(&mut hasher, tag);
                feed(&mut hasher, &value.to_string());
            }
        }
        for edge in &self.edges {
            feed(&mut hasher, "edge");
            feed(&mut hasher, edge.src.as_str());
            feed(&mut hasher, edge.dst.as_str());
            feed(&mut hasher, edge.dep_type.as_str());
            feed_loc(&mut hasher, edge.loc.as_ref());
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn feed(hasher: &mut blake3::Hasher, s: &str) {
    // Length prefix keeps ("ab","c") and ("a","bc") apart.
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn feed_opt(hasher: &mut blake3::Hasher, s: Option<&str>) {
    match s {
        Some(s) => {
            hasher.update(&[1]);
            feed(hasher, s);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn feed_loc(hasher: &mut blake3::Hasher, loc: Option<&SourceLoc>) {
    let Some(loc) = loc else {
        hasher.update(&[0]);
        return;
    };
    hasher.update(&[1]);
    feed(hasher, &loc.file);
    feed_pos(hasher, loc.start);
    feed_pos(hasher, loc.end);
}

fn feed_pos(hasher: &mut blake3::Hasher, pos: Option<SourcePos>) {
    match pos {
        Some(pos) => {
            hasher.update(&[1]);
            hasher.update(&pos.line.to_le_bytes());
            hasher.update(&pos.column.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_enum_parses_known_values_case_insensitively() {
        assert_eq!(DepType::from("Call"), DepType::Call);
        assert_eq!(SymbolKind::from(" class "), SymbolKind::Class);
        assert_eq!(Language::from("TypeScript"), Language::TypeScript);
    }

    #[test]
    fn open_enum_keeps_unknown_values() {
        let dep = DepType::from("annotate");
        assert_eq!(dep, DepType::Other("annotate".into()));
        assert_eq!(dep.as_str(), "annotate");
    }

    #[test]
    fn open_enum_serializes_as_string() {
        let json = serde_json::to_string(&DepType::Inherit).unwrap();
        assert_eq!(json, "\"inherit\"");
        let back: DepType = serde_json::from_str("\"macro-expand\"").unwrap();
        assert_eq!(back, DepType::Other("macro-expand".into()));
    }

    #[test]
    fn canonical_id_derivation() {
        let id = CanonicalId::derive(&Language::Python, &SymbolKind::Class, "app.domain.Order");
        assert_eq!(id.as_str(), "python:class:app.domain.Order");
    }

    #[test]
    fn node_name_is_last_segment() {
        let n = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.Order");
        assert_eq!(n.name(), "Order");
        let r = IRNode::new(Language::Rust, SymbolKind::Struct, "crate::domain::Order");
        assert_eq!(r.name(), "Order");
    }

    #[test]
    fn edge_key_distinguishes_dep_type() {
        let a = CanonicalId::from("a");
        let b = CanonicalId::from("b");
        let call = IREdge::new(a.clone(), b.clone(), DepType::Call);
        let import = IREdge::new(a, b, DepType::Import);
        assert_ne!(call.key(), import.key());
    }

    #[test]
    fn fingerprint_changes_with_payload() {
        let n = IRNode::new(Language::Python, SymbolKind::Class, "a.B");
        let g1 = ArchitectureIR::new(vec![n.clone()], vec![]);
        let g2 = ArchitectureIR::new(vec![n.with_layer("domain")], vec![]);
        assert_ne!(g1.fingerprint(), g2.fingerprint());
        assert_eq!(g1.fingerprint(), g1.clone().fingerprint());
    }

    #[test]
    fn attr_values_deserialize_untagged() {
        let n: IRNode = serde_json::from_str(
            r#"{"id":"x","fqname":"x","kind":"class","language":"python",
                "attributes":{"public":true,"loc":12,"team":"core"}}"#,
        )
        .unwrap();
        assert_eq!(n.attributes["public"], AttrValue::Bool(true));
        assert_eq!(n.attributes["loc"], AttrValue::Int(12));
        assert_eq!(n.attributes["team"], AttrValue::Str("core".into()));
    }
}
