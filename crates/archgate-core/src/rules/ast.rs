//! Syntax tree of the rule DSL.
//!
//! The tree is what the parser produces and nothing more: field names are
//! still strings and literals are still untyped. Every node keeps the
//! position it was parsed from so the compiler can point at it.

use std::fmt;

use super::types::{RuleAction, RuleTarget};
use crate::error::ErrorLocation;

/// A `line:column` position in rule source (both 1-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Line.
    pub line: usize,
    /// Column.
    pub column: usize,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Converts into an error location in `file`.
    ///
    /// The default span marks synthesized syntax and carries no position.
    #[must_use]
    pub fn location(self, file: Option<&str>) -> ErrorLocation {
        let known = self != Self::default();
        ErrorLocation {
            file: file.map(str::to_string),
            line: known.then_some(self.line),
            column: known.then_some(self.column),
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralAst {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Str(String),
}

impl fmt::Display for LiteralAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A reference to a field of the rule target, e.g. `layer` or `src.kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAst {
    /// Dotted field name as written.
    pub name: String,
    /// Where it was written.
    pub span: Span,
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandAst {
    /// A field reference.
    Field(FieldAst),
    /// A scalar literal.
    Literal {
        /// Value.
        value: LiteralAst,
        /// Position.
        span: Span,
    },
    /// A list literal (right-hand side of `in`).
    List {
        /// Items.
        items: Vec<LiteralAst>,
        /// Position of the opening bracket.
        span: Span,
    },
}

impl OperandAst {
    /// Position of the operand.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Field(f) => f.span,
            Self::Literal { span, .. } | Self::List { span, .. } => *span,
        }
    }
}

impl fmt::Display for OperandAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(&field.name),
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::List { items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` or `==`.
    Eq,
    /// `!=`.
    Ne,
    /// `in`.
    In,
    /// `not in`.
    NotIn,
    /// `matches` (glob).
    Matches,
    /// `=~` (regex).
    RegexMatch,
}

impl CompareOp {
    /// Returns the operator as written in the DSL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Matches => "matches",
            Self::RegexMatch => "=~",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprAst {
    /// `left and right`.
    And(Box<ExprAst>, Box<ExprAst>),
    /// `left or right`.
    Or(Box<ExprAst>, Box<ExprAst>),
    /// `not inner`.
    Not(Box<ExprAst>),
    /// `left op right`.
    Compare {
        /// Left operand.
        left: OperandAst,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: OperandAst,
        /// Position of the operator.
        span: Span,
    },
    /// An operand used on its own as a condition (only `true`/`false`
    /// compile).
    Operand(OperandAst),
}

impl ExprAst {
    /// Builds `left and right`.
    #[must_use]
    pub fn and(left: ExprAst, right: ExprAst) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Builds `left or right`.
    #[must_use]
    pub fn or(left: ExprAst, right: ExprAst) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Builds `not inner`.
    #[must_use]
    pub fn not(inner: ExprAst) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Builds `field op literal` at a synthetic position.
    #[must_use]
    pub fn compare(field: &str, op: CompareOp, right: OperandAst) -> Self {
        Self::Compare {
            left: OperandAst::Field(FieldAst {
                name: field.to_string(),
                span: Span::default(),
            }),
            op,
            right,
            span: Span::default(),
        }
    }
}

/// A `when` (or `within`) expression of a node rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeWhenAst(pub ExprAst);

/// A `when` (or `within`) expression of a dependency rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyWhenAst(pub ExprAst);

/// A condition, specialized by the kind of target it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhenAst {
    /// Over nodes.
    Node(NodeWhenAst),
    /// Over dependencies.
    Dependency(DependencyWhenAst),
}

impl WhenAst {
    /// Wraps `expr` for `target`.
    #[must_use]
    pub fn new(target: RuleTarget, expr: ExprAst) -> Self {
        match target {
            RuleTarget::Node => Self::Node(NodeWhenAst(expr)),
            RuleTarget::Dependency => Self::Dependency(DependencyWhenAst(expr)),
        }
    }

    /// The target kind this condition is written against.
    #[must_use]
    pub fn target(&self) -> RuleTarget {
        match self {
            Self::Node(_) => RuleTarget::Node,
            Self::Dependency(_) => RuleTarget::Dependency,
        }
    }

    /// The underlying expression.
    #[must_use]
    pub fn expr(&self) -> &ExprAst {
        match self {
            Self::Node(NodeWhenAst(e)) | Self::Dependency(DependencyWhenAst(e)) => e,
        }
    }
}

/// One parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAst {
    /// Rule id.
    pub id: String,
    /// Optional display name (defaults to the id).
    pub name: Option<String>,
    /// Disposition.
    pub action: RuleAction,
    /// Scope restriction.
    pub within: Option<WhenAst>,
    /// Condition.
    pub when: WhenAst,
    /// Severity name as written, with its position.
    pub severity: Option<(String, Span)>,
    /// Custom message.
    pub message: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Source file, if the document was named.
    pub file: Option<String>,
    /// Position of the `rule` keyword.
    pub span: Span,
}

impl RuleAst {
    /// Creates a rule with only the required parts set.
    #[must_use]
    pub fn new(id: impl Into<String>, action: RuleAction, when: WhenAst) -> Self {
        Self {
            id: id.into(),
            name: None,
            action,
            within: None,
            when,
            severity: None,
            message: None,
            description: None,
            file: None,
            span: Span::default(),
        }
    }

    /// Target kind of the rule.
    #[must_use]
    pub fn target(&self) -> RuleTarget {
        self.when.target()
    }

    /// Error location of the rule header.
    #[must_use]
    pub fn location(&self) -> ErrorLocation {
        self.span.location(self.file.as_deref())
    }
}

/// An ordered sequence of parsed rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesDocumentAst {
    /// Rules in source order.
    pub rules: Vec<RuleAst>,
}

impl RulesDocumentAst {
    /// Appends the rules of `other`, keeping order.
    pub fn extend(&mut self, other: RulesDocumentAst) {
        self.rules.extend(other.rules);
    }

    /// Concatenates documents in order.
    #[must_use]
    pub fn concat(docs: impl IntoIterator<Item = RulesDocumentAst>) -> Self {
        let mut out = Self::default();
        for doc in docs {
            out.extend(doc);
        }
        out
    }
}
