//! Field matchers and composable node/edge filters.
//!
//! Two pattern dialects are supported:
//!
//! - **glob**: `*` and `?` stay within one `/`-separated component, `**` as
//!   a whole component spans any number of them. Everything else is literal
//!   and the whole field must match.
//! - **regex**: the `regex` crate syntax, anchored to the whole field unless
//!   the author anchors it (leading `^` or trailing `$`).

use std::fmt;

use glob::MatchOptions;
use thiserror::Error;

use super::index::IRIndex;
use super::types::{AttrValue, DepType, IREdge, IRNode, Language, SymbolKind};

/// An invalid pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The glob does not parse.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidGlob {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },
    /// The regex does not parse.
    #[error("invalid regex `{pattern}`: {message}")]
    InvalidRegex {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled glob pattern.
#[derive(Clone)]
pub struct GlobMatcher {
    raw: String,
    compiled: glob::Pattern,
}

impl GlobMatcher {
    /// Compiles a glob.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidGlob`] if the pattern does not parse.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let compiled = glob::Pattern::new(pattern).map_err(|e| PatternError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests a value.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.compiled.matches_with(value, GLOB_OPTIONS)
    }
}

impl fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobMatcher").field(&self.raw).finish()
    }
}

impl PartialEq for GlobMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// A compiled, full-field regex.
#[derive(Clone)]
pub struct RegexMatcher {
    raw: String,
    compiled: regex::Regex,
}

impl RegexMatcher {
    /// Compiles a regex.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidRegex`] if the pattern does not parse.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let anchored = if pattern.starts_with('^') || pattern.ends_with('$') {
            pattern.to_string()
        } else {
            format!("^(?:{pattern})$")
        };
        let compiled = regex::Regex::new(&anchored).map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Returns the source pattern (before anchoring).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests a value.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.compiled.is_match(value)
    }
}

impl fmt::Debug for RegexMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexMatcher").field(&self.raw).finish()
    }
}

impl PartialEq for RegexMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// Matches `value` against a glob.
///
/// # Errors
///
/// Returns an error if the pattern is invalid.
pub fn match_glob(value: &str, pattern: &str) -> Result<bool, PatternError> {
    Ok(GlobMatcher::new(pattern)?.is_match(value))
}

/// Matches `value` against a regex.
///
/// # Errors
///
/// Returns an error if the pattern is invalid.
pub fn match_regex(value: &str, pattern: &str) -> Result<bool, PatternError> {
    Ok(RegexMatcher::new(pattern)?.is_match(value))
}

/// A string pattern in one of the supported dialects.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Glob dialect.
    Glob(GlobMatcher),
    /// Regex dialect.
    Regex(RegexMatcher),
    /// Literal equality.
    Exact(String),
}

impl Pattern {
    /// Tests a value.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Glob(g) => g.is_match(value),
            Self::Regex(r) => r.is_match(value),
            Self::Exact(s) => s == value,
        }
    }
}

// ────────────────────────────────────────────
// Filters
// ────────────────────────────────────────────

/// A predicate over nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFilter {
    /// Matches every node.
    Any,
    /// Kind equals.
    Kind(SymbolKind),
    /// Language equals.
    Language(Language),
    /// Layer equals (unset never matches).
    Layer(String),
    /// Container equals (unset never matches).
    Container(String),
    /// Context equals (unset never matches).
    Context(String),
    /// Fully-qualified name matches.
    Fqname(Pattern),
    /// Source file matches (no location never matches).
    File(Pattern),
    /// Attribute equals.
    Attr(String, AttrValue),
    /// All of.
    And(Vec<NodeFilter>),
    /// Any of.
    Or(Vec<NodeFilter>),
    /// Negation.
    Not(Box<NodeFilter>),
}

impl NodeFilter {
    /// Tests a node.
    #[must_use]
    pub fn matches(&self, node: &IRNode) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(kind) => &node.kind == kind,
            Self::Language(language) => &node.language == language,
            Self::Layer(layer) => node.layer.as_deref() == Some(layer.as_str()),
            Self::Container(c) => node.container.as_deref() == Some(c.as_str()),
            Self::Context(c) => node.context.as_deref() == Some(c.as_str()),
            Self::Fqname(pattern) => pattern.is_match(&node.fqname),
            Self::File(pattern) => node.file().is_some_and(|f| pattern.is_match(f)),
            Self::Attr(key, value) => node.attributes.get(key) == Some(value),
            Self::And(all) => all.iter().all(|f| f.matches(node)),
            Self::Or(any) => any.iter().any(|f| f.matches(node)),
            Self::Not(inner) => !inner.matches(node),
        }
    }

    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: NodeFilter) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }
}

/// A predicate over edges.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFilter {
    /// Matches every edge.
    Any,
    /// Dependency type equals.
    DepType(DepType),
    /// The source node matches.
    Src(NodeFilter),
    /// The destination node matches.
    Dst(NodeFilter),
    /// All of.
    And(Vec<EdgeFilter>),
    /// Any of.
    Or(Vec<EdgeFilter>),
    /// Negation.
    Not(Box<EdgeFilter>),
}

impl EdgeFilter {
    /// Tests an edge. Endpoint filters are false for unknown endpoints.
    #[must_use]
    pub fn matches(&self, edge: &IREdge, index: &IRIndex<'_>) -> bool {
        match self {
            Self::Any => true,
            Self::DepType(dep_type) => &edge.dep_type == dep_type,
            Self::Src(f) => index.node(&edge.src).is_some_and(|n| f.matches(n)),
            Self::Dst(f) => index.node(&edge.dst).is_some_and(|n| f.matches(n)),
            Self::And(all) => all.iter().all(|f| f.matches(edge, index)),
            Self::Or(any) => any.iter().any(|f| f.matches(edge, index)),
            Self::Not(inner) => !inner.matches(edge, index),
        }
    }
}

/// Nodes matching `filter`, in canonical order.
#[must_use]
pub fn select_nodes<'a>(index: &IRIndex<'a>, filter: &NodeFilter) -> Vec<&'a IRNode> {
    index.nodes().iter().filter(|n| filter.matches(n)).collect()
}

/// Edges matching `filter`, in canonical order.
#[must_use]
pub fn select_edges<'a>(index: &IRIndex<'a>, filter: &EdgeFilter) -> Vec<&'a IREdge> {
    index
        .edges()
        .iter()
        .filter(|e| filter.matches(e, index))
        .collect()
}
