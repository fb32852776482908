//! Violations and their stable identity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::{CanonicalId, DepType, SourceLoc};
use crate::rules::RuleRef;

/// The element a violation is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationTarget {
    /// A node.
    Node {
        /// Node id.
        id: CanonicalId,
    },
    /// An edge.
    Dependency {
        /// Source id.
        src: CanonicalId,
        /// Destination id.
        dst: CanonicalId,
        /// Dependency type.
        dep_type: DepType,
    },
}

/// Identity of a violation across runs.
///
/// Built only from the rule id and the logical identity of the target, so
/// moving code around (new line numbers, reformatting) keeps the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationKey(String);

impl ViolationKey {
    /// Wraps a precomputed key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViolationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes stable violation keys.
pub trait ViolationKeyStrategy {
    /// Key for a match of `rule_id` on `target`.
    fn key(&self, rule_id: &str, target: &ViolationTarget) -> ViolationKey;

    /// Recomputes the key of an existing violation.
    fn key_for(&self, violation: &Violation) -> ViolationKey {
        self.key(&violation.rule.id, &violation.target)
    }
}

/// `{rule}|node|{id}` and `{rule}|dependency|{src}|{dst}|{dep_type}`.
///
/// A `|` or backslash inside a component is escaped with a backslash.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultViolationKeyStrategy;

impl ViolationKeyStrategy for DefaultViolationKeyStrategy {
    fn key(&self, rule_id: &str, target: &ViolationTarget) -> ViolationKey {
        let parts: Vec<&str> = match target {
            ViolationTarget::Node { id } => vec![rule_id, "node", id.as_str()],
            ViolationTarget::Dependency { src, dst, dep_type } => vec![
                rule_id,
                "dependency",
                src.as_str(),
                dst.as_str(),
                dep_type.as_str(),
            ],
        };
        let mut key = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                key.push('|');
            }
            for c in part.chars() {
                if matches!(c, '|' | '\\') {
                    key.push('\\');
                }
                key.push(c);
            }
        }
        ViolationKey(key)
    }
}

/// One rule match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that matched.
    pub rule: RuleRef,
    /// What it matched.
    pub target: ViolationTarget,
    /// Human-readable message.
    pub message: String,
    /// Stable identity.
    pub key: ViolationKey,
    /// Display fields captured at match time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    /// Best-effort source location (node definition or reference site).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLoc>,
}
