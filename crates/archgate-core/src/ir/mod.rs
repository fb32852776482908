//! The intermediate-representation graph.
//!
//! Fragments come in from extractors, get merged and normalized into one
//! [`ArchitectureIR`], and are then indexed for rule evaluation:
//!
//! ```text
//! IrFragment* ──merge──▶ ArchitectureIR ──normalize──▶ ArchitectureIR ──build_index──▶ IRIndex
//! ```

pub mod fragment;
pub mod index;
pub mod keys;
pub mod merge;
pub mod normalize;
pub mod select;
pub mod types;
pub mod validate;

pub use fragment::{IrFragment, RawEdge, RawNode};
pub use index::{build_index, IRIndex};
pub use keys::{dedupe_edges, dedupe_nodes, edge_key, node_key};
pub use merge::IrMerger;
pub use normalize::{normalize, DanglingEdges, IrNormalizer, NormalizeOptions, Normalized};
pub use select::{
    match_glob, match_regex, select_edges, select_nodes, EdgeFilter, GlobMatcher, NodeFilter,
    Pattern, PatternError, RegexMatcher,
};
pub use types::{
    ArchitectureIR, AttrValue, CanonicalId, DepType, EdgeKey, IREdge, IRNode, Language,
    SourceLoc, SourcePos, SymbolKind,
};
pub use validate::{validate_ir, IrIssue, IrValidationOptions};
