//! Compiled rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::compiler::CompiledCondition;
use super::schema::{EvalFault, EvalTarget};
use crate::error::ErrorLocation;
use crate::types::Severity;

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// Every node.
    Node,
    /// Every edge.
    Dependency,
}

impl RuleTarget {
    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Targets matching the condition are violations.
    Deny,
    /// Like `deny`, with a default severity of warning.
    Warn,
    /// Targets in scope that do *not* match the condition are violations.
    Allow,
}

impl RuleAction {
    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Warn => "warn",
            Self::Allow => "allow",
        }
    }

    /// How a true condition is interpreted.
    #[must_use]
    pub fn match_mode(self) -> MatchMode {
        match self {
            Self::Deny | Self::Warn => MatchMode::Violates,
            Self::Allow => MatchMode::MustHold,
        }
    }

    /// Severity used when the rule does not set one.
    #[must_use]
    pub fn default_severity(self) -> Severity {
        match self {
            Self::Warn => Severity::Warning,
            Self::Deny | Self::Allow => Severity::Error,
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the evaluator turns a condition result into a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Condition true means violation.
    Violates,
    /// Condition false (within scope) means violation.
    MustHold,
}

/// Serializable reference to a rule, carried by violations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
    /// Rule id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Severity.
    pub severity: Severity,
    /// Target kind.
    pub target: RuleTarget,
    /// Action.
    pub action: RuleAction,
}

/// A compiled, immutable rule.
#[derive(Clone)]
pub struct Rule {
    /// Unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Target kind.
    pub target: RuleTarget,
    /// Action.
    pub action: RuleAction,
    /// Severity.
    pub severity: Severity,
    /// Custom message template.
    pub message: Option<String>,
    /// Where the rule was declared.
    pub location: Option<ErrorLocation>,
    pub(crate) mode: MatchMode,
    pub(crate) scope: Option<CompiledCondition>,
    pub(crate) condition: CompiledCondition,
}

impl Rule {
    /// How the condition is interpreted.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// The `within` condition, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&CompiledCondition> {
        self.scope.as_ref()
    }

    /// The `when` condition.
    #[must_use]
    pub fn condition(&self) -> &CompiledCondition {
        &self.condition
    }

    /// Returns a serializable reference to this rule.
    #[must_use]
    pub fn to_ref(&self) -> RuleRef {
        RuleRef {
            id: self.id.clone(),
            name: self.name.clone(),
            severity: self.severity,
            target: self.target,
            action: self.action,
        }
    }

    /// Decides whether `target` violates this rule.
    ///
    /// Targets outside the scope never violate. Inside it, the condition is
    /// read according to [`Rule::mode`].
    ///
    /// # Errors
    ///
    /// Propagates faults raised while reading fields off the target.
    pub fn is_violated_by(&self, target: &EvalTarget<'_>) -> Result<bool, EvalFault> {
        if let Some(scope) = &self.scope {
            if !scope.eval(target)? {
                return Ok(false);
            }
        }
        let holds = self.condition.eval(target)?;
        Ok(match self.mode {
            MatchMode::Violates => holds,
            MatchMode::MustHold => !holds,
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("action", &self.action)
            .field("severity", &self.severity)
            .field("scope", &self.scope)
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates a rule set; order is evaluation order.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Rules in order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Iterates rules in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Looks up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
