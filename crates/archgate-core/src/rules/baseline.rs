//! Classifies current violations against a stored baseline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::violation::{
    DefaultViolationKeyStrategy, Violation, ViolationKey, ViolationKeyStrategy,
};

/// Where a violation stands relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationStatus {
    /// Not in the baseline.
    New,
    /// In the baseline and still present.
    Existing,
    /// In the baseline, no longer present.
    Fixed,
    /// No baseline to compare against.
    Unknown,
}

impl ViolationStatus {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Existing => "existing",
            Self::Fixed => "fixed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`BaselineComparer::compare`]. Each bucket is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineResult {
    /// Current violations whose key is not in the baseline.
    pub new: Vec<Violation>,
    /// Current violations already in the baseline.
    pub accepted: Vec<Violation>,
    /// Baseline violations that no longer occur.
    pub fixed: Vec<Violation>,
}

impl BaselineResult {
    /// Status of a key in this result.
    #[must_use]
    pub fn status_of(&self, key: &ViolationKey) -> ViolationStatus {
        let has = |bucket: &[Violation]| bucket.binary_search_by(|v| v.key.cmp(key)).is_ok();
        if has(&self.new) {
            ViolationStatus::New
        } else if has(&self.accepted) {
            ViolationStatus::Existing
        } else if has(&self.fixed) {
            ViolationStatus::Fixed
        } else {
            ViolationStatus::Unknown
        }
    }

    /// `true` when nothing new was introduced.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.new.is_empty()
    }
}

/// Compares violation sets by stable key.
///
/// Keys are recomputed with the strategy on both sides, so a baseline
/// written by an older version with a differently rendered message, or a
/// stale stored key, still lines up.
#[derive(Debug, Clone, Default)]
pub struct BaselineComparer<S = DefaultViolationKeyStrategy> {
    keys: S,
}

impl BaselineComparer {
    /// Creates a comparer with the default key strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ViolationKeyStrategy> BaselineComparer<S> {
    /// Creates a comparer with a custom key strategy.
    #[must_use]
    pub fn with_key_strategy(keys: S) -> Self {
        Self { keys }
    }

    /// Partitions `current` into new and accepted, and finds what was fixed.
    ///
    /// Duplicate keys within one side collapse to the first occurrence.
    #[must_use]
    pub fn compare(&self, baseline: &[Violation], current: &[Violation]) -> BaselineResult {
        let before = self.keyed(baseline);
        let after = self.keyed(current);

        let mut result = BaselineResult::default();
        for (key, violation) in &after {
            if before.contains_key(key) {
                result.accepted.push(violation.clone());
            } else {
                result.new.push(violation.clone());
            }
        }
        result.fixed = before
            .into_iter()
            .filter(|(key, _)| !after.contains_key(key))
            .map(|(_, violation)| violation)
            .collect();

        debug!(
            new = result.new.len(),
            accepted = result.accepted.len(),
            fixed = result.fixed.len(),
            "compared against baseline"
        );
        result
    }

    fn keyed(&self, violations: &[Violation]) -> BTreeMap<ViolationKey, Violation> {
        let mut out: BTreeMap<ViolationKey, Violation> = BTreeMap::new();
        for v in violations {
            let key = self.keys.key_for(v);
            out.entry(key.clone()).or_insert_with(|| {
                let mut owned = v.clone();
                owned.key = key;
                owned
            });
        }
        out
    }
}
