//! Report value types handed to renderers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArchError;
use crate::rules::{BaselineComparer, BaselineResult, ViolationStatus};
use crate::snapshot::SnapshotDiff;
use crate::types::Severity;
use crate::violation::Violation;

/// Facts about the run that produced a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Repository root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<String>,
    /// Tool version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// When the run started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Baseline the run was compared against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    /// Number of rules evaluated.
    pub rules: usize,
    /// Nodes in the evaluated graph.
    pub nodes: usize,
    /// Edges in the evaluated graph.
    pub edges: usize,
    /// Fingerprint of the evaluated graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// A violation with its baseline status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedViolation {
    /// Baseline status.
    pub status: ViolationStatus,
    /// The violation.
    #[serde(flatten)]
    pub violation: Violation,
}

/// Counts over a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Current violations.
    pub total: usize,
    /// Violations not covered by a baseline (new, or every violation when
    /// there is no baseline).
    pub new: usize,
    /// Violations already in the baseline.
    pub existing: usize,
    /// Baseline violations that no longer occur.
    pub fixed: usize,
    /// Current violations per severity.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Uncovered violations per severity.
    pub new_by_severity: BTreeMap<Severity, usize>,
    /// Errors recorded during the run.
    pub errors: usize,
}

impl Summary {
    /// Uncovered violations at or above `fail_on`.
    #[must_use]
    pub fn blocking(&self, fail_on: Severity) -> usize {
        self.new_by_severity
            .iter()
            .filter(|(severity, _)| **severity >= fail_on)
            .map(|(_, n)| n)
            .sum()
    }
}

/// Graph delta between the baseline and the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Ref of the earlier snapshot.
    pub from: String,
    /// Ref or label of the later one.
    pub to: String,
    /// Nodes added.
    pub nodes_added: usize,
    /// Nodes removed.
    pub nodes_removed: usize,
    /// Nodes with changed payload.
    pub nodes_changed: usize,
    /// Edges added.
    pub edges_added: usize,
    /// Edges removed.
    pub edges_removed: usize,
    /// Edges with changed payload.
    pub edges_changed: usize,
}

impl DiffSummary {
    /// Summarizes `diff` between `from` and `to`.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, diff: &SnapshotDiff) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            nodes_added: diff.nodes_added,
            nodes_removed: diff.nodes_removed,
            nodes_changed: diff.nodes_changed,
            edges_added: diff.edges_added,
            edges_removed: diff.edges_removed,
            edges_changed: diff.edges_changed,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Run facts.
    pub run: RunInfo,
    /// Current violations in evaluation order.
    pub violations: Vec<ReportedViolation>,
    /// Baseline violations that no longer occur.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed: Vec<Violation>,
    /// Counts.
    pub summary: Summary,
    /// Graph delta against the baseline snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffSummary>,
    /// Errors recorded during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ArchError>,
}

impl Report {
    /// Starts a report.
    #[must_use]
    pub fn builder(run: RunInfo) -> ReportBuilder {
        ReportBuilder::new(run)
    }

    /// `true` if any recorded error aborts the run.
    #[must_use]
    pub fn has_fatal_errors(&self) -> bool {
        self.errors.iter().any(ArchError::is_fatal)
    }

    /// Violations with the given status.
    pub fn with_status(&self, status: ViolationStatus) -> impl Iterator<Item = &ReportedViolation> {
        self.violations.iter().filter(move |v| v.status == status)
    }
}

/// Builds a [`Report`] from evaluation output.
#[derive(Debug, Clone)]
#[must_use]
pub struct ReportBuilder {
    run: RunInfo,
    violations: Vec<Violation>,
    baseline: Option<Baseline>,
    diff: Option<DiffSummary>,
    errors: Vec<ArchError>,
}

#[derive(Debug, Clone)]
enum Baseline {
    Raw(Vec<Violation>),
    Compared(BaselineResult),
}

impl ReportBuilder {
    /// Creates a builder.
    pub fn new(run: RunInfo) -> Self {
        Self {
            run,
            violations: Vec::new(),
            baseline: None,
            diff: None,
            errors: Vec::new(),
        }
    }

    /// Current violations.
    pub fn violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    /// Baseline violations to compare against with the default key strategy.
    pub fn baseline(mut self, baseline: Vec<Violation>) -> Self {
        self.baseline = Some(Baseline::Raw(baseline));
        self
    }

    /// A comparison already made by a [`BaselineComparer`].
    ///
    /// Use this when the violations were keyed by a custom
    /// [`ViolationKeyStrategy`](crate::ViolationKeyStrategy); the comparer
    /// must use the same strategy.
    pub fn baseline_result(mut self, result: BaselineResult) -> Self {
        self.baseline = Some(Baseline::Compared(result));
        self
    }

    /// Graph delta.
    pub fn diff(mut self, diff: DiffSummary) -> Self {
        self.diff = Some(diff);
        self
    }

    /// Run errors.
    pub fn errors(mut self, errors: Vec<ArchError>) -> Self {
        self.errors.extend(errors);
        self
    }

    /// Classifies violations and computes the summary.
    #[must_use]
    pub fn build(self) -> Report {
        let (violations, fixed): (Vec<ReportedViolation>, Vec<Violation>) = match self.baseline {
            Some(baseline) => {
                let result = match baseline {
                    Baseline::Raw(baseline) => {
                        BaselineComparer::new().compare(&baseline, &self.violations)
                    }
                    Baseline::Compared(result) => result,
                };
                let reported = self
                    .violations
                    .into_iter()
                    .map(|violation| ReportedViolation {
                        status: match result.status_of(&violation.key) {
                            ViolationStatus::Existing => ViolationStatus::Existing,
                            _ => ViolationStatus::New,
                        },
                        violation,
                    })
                    .collect::<Vec<_>>();
                (reported, result.fixed)
            }
            None => {
                let reported = self
                    .violations
                    .into_iter()
                    .map(|violation| ReportedViolation {
                        status: ViolationStatus::Unknown,
                        violation,
                    })
                    .collect::<Vec<_>>();
                (reported, Vec::new())
            }
        };

        let summary = summarize(&violations, fixed.len(), self.errors.len());
        Report {
            run: self.run,
            violations,
            fixed,
            summary,
            diff: self.diff,
            errors: self.errors,
        }
    }
}

fn summarize(violations: &[ReportedViolation], fixed: usize, errors: usize) -> Summary {
    let mut summary = Summary {
        total: violations.len(),
        fixed,
        errors,
        ..Summary::default()
    };
    for reported in violations {
        let severity = reported.violation.rule.severity;
        *summary.by_severity.entry(severity).or_default() += 1;
        if reported.status == ViolationStatus::Existing {
            summary.existing += 1;
        } else {
            summary.new += 1;
            *summary.new_by_severity.entry(severity).or_default() += 1;
        }
    }
    summary
}
