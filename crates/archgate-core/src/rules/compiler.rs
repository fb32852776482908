//! Turns a [`RulesDocumentAst`] into an executable [`RuleSet`].
//!
//! Every field name is resolved against the schema, every literal is type
//! checked against its field, and every pattern is compiled up front. What
//! comes out cannot fail on user input any more; the only runtime failures
//! left are [`EvalFault`]s, which indicate a bug upstream.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::ast::{CompareOp, ExprAst, LiteralAst, OperandAst, RuleAst, RulesDocumentAst, Span};
use super::schema::{EvalFault, EvalTarget, Field, Value};
use super::types::{Rule, RuleSet, RuleTarget};
use crate::error::{ArchError, ArchResult};
use crate::ir::{GlobMatcher, RegexMatcher};
use crate::types::Severity;

/// An executable condition over one target.
pub type Predicate = Arc<dyn Fn(&EvalTarget<'_>) -> Result<bool, EvalFault> + Send + Sync>;

fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&EvalTarget<'_>) -> Result<bool, EvalFault> + Send + Sync + 'static,
{
    Arc::new(f)
}

// ────────────────────────────────────────────
// Compiled expression tree
// ────────────────────────────────────────────

/// The test applied to a single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTest {
    /// Equal to the literal.
    Eq(LiteralAst),
    /// Not equal to the literal (true when absent).
    Ne(LiteralAst),
    /// Equal to one of the literals.
    In(Vec<LiteralAst>),
    /// Equal to none of the literals (true when absent).
    NotIn(Vec<LiteralAst>),
    /// Matches the glob.
    Glob(GlobMatcher),
    /// Matches the regex.
    Regex(RegexMatcher),
}

impl FieldTest {
    /// Applies the test to a value.
    #[must_use]
    pub fn check(&self, value: Value<'_>) -> bool {
        match self {
            Self::Eq(lit) => literal_eq(value, lit),
            Self::Ne(lit) => !literal_eq(value, lit),
            Self::In(list) => list.iter().any(|lit| literal_eq(value, lit)),
            Self::NotIn(list) => !list.iter().any(|lit| literal_eq(value, lit)),
            Self::Glob(glob) => value.text().is_some_and(|t| glob.is_match(&t)),
            Self::Regex(regex) => value.text().is_some_and(|t| regex.is_match(&t)),
        }
    }
}

fn literal_eq(value: Value<'_>, lit: &LiteralAst) -> bool {
    match (value, lit) {
        (Value::Str(a), LiteralAst::Str(b)) => a == b,
        (Value::Int(a), LiteralAst::Int(b)) => a == *b,
        (Value::Bool(a), LiteralAst::Bool(b)) => a == *b,
        _ => false,
    }
}

/// A type-checked expression with resolved fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    /// `true` or `false`.
    Const(bool),
    /// A field compared with a literal or pattern.
    Test {
        /// Field read off the target.
        field: Field,
        /// Test applied to it.
        test: FieldTest,
    },
    /// Two fields compared with each other (`=` or `!=`).
    FieldsEqual {
        /// Left field.
        left: Field,
        /// Right field.
        right: Field,
        /// True for `!=`.
        negate: bool,
    },
    /// Conjunction, short-circuiting.
    And(Box<CompiledExpr>, Box<CompiledExpr>),
    /// Disjunction, short-circuiting.
    Or(Box<CompiledExpr>, Box<CompiledExpr>),
    /// Negation.
    Not(Box<CompiledExpr>),
}

impl CompiledExpr {
    /// Evaluates the tree directly, without the compiled closure.
    ///
    /// # Errors
    ///
    /// Propagates field read faults.
    pub fn eval(&self, target: &EvalTarget<'_>) -> Result<bool, EvalFault> {
        Ok(match self {
            Self::Const(b) => *b,
            Self::Test { field, test } => test.check(field.read(target)?),
            Self::FieldsEqual {
                left,
                right,
                negate,
            } => fields_equal(left.read(target)?, right.read(target)?) != *negate,
            Self::And(l, r) => l.eval(target)? && r.eval(target)?,
            Self::Or(l, r) => l.eval(target)? || r.eval(target)?,
            Self::Not(inner) => !inner.eval(target)?,
        })
    }

    /// Builds the closure equivalent to this tree.
    #[must_use]
    pub fn to_predicate(&self) -> Predicate {
        match self.clone() {
            Self::Const(b) => predicate(move |_| Ok(b)),
            Self::Test { field, test } => predicate(move |t| Ok(test.check(field.read(t)?))),
            Self::FieldsEqual {
                left,
                right,
                negate,
            } => predicate(move |t| Ok(fields_equal(left.read(t)?, right.read(t)?) != negate)),
            Self::And(l, r) => {
                let (l, r) = (l.to_predicate(), r.to_predicate());
                predicate(move |t| Ok(l(t)? && r(t)?))
            }
            Self::Or(l, r) => {
                let (l, r) = (l.to_predicate(), r.to_predicate());
                predicate(move |t| Ok(l(t)? || r(t)?))
            }
            Self::Not(inner) => {
                let inner = inner.to_predicate();
                predicate(move |t| Ok(!inner(t)?))
            }
        }
    }
}

fn fields_equal(a: Value<'_>, b: Value<'_>) -> bool {
    !a.is_absent() && a == b
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &CompiledExpr, parent_is_and: bool) -> fmt::Result {
    let needs_parens = match expr {
        CompiledExpr::Or(..) => parent_is_and,
        CompiledExpr::And(..) => !parent_is_and,
        _ => false,
    };
    if needs_parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[LiteralAst]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(b) => write!(f, "{b}"),
            Self::Test { field, test } => match test {
                FieldTest::Eq(lit) => write!(f, "{field} = {lit}"),
                FieldTest::Ne(lit) => write!(f, "{field} != {lit}"),
                FieldTest::In(list) => {
                    write!(f, "{field} in ")?;
                    write_list(f, list)
                }
                FieldTest::NotIn(list) => {
                    write!(f, "{field} not in ")?;
                    write_list(f, list)
                }
                FieldTest::Glob(g) => write!(f, "{field} matches {:?}", g.as_str()),
                FieldTest::Regex(r) => write!(f, "{field} =~ {:?}", r.as_str()),
            },
            Self::FieldsEqual {
                left,
                right,
                negate,
            } => {
                let op = if *negate { "!=" } else { "=" };
                write!(f, "{left} {op} {right}")
            }
            Self::And(l, r) => {
                write_operand(f, l, true)?;
                f.write_str(" and ")?;
                write_operand(f, r, true)
            }
            Self::Or(l, r) => {
                write_operand(f, l, false)?;
                f.write_str(" or ")?;
                write_operand(f, r, false)
            }
            Self::Not(inner) => match **inner {
                Self::And(..) | Self::Or(..) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
        }
    }
}

/// A compiled expression paired with its executable closure.
#[derive(Clone)]
pub struct CompiledCondition {
    expr: CompiledExpr,
    predicate: Predicate,
}

impl CompiledCondition {
    /// Compiles the closure for `expr`.
    #[must_use]
    pub fn new(expr: CompiledExpr) -> Self {
        let predicate = expr.to_predicate();
        Self { expr, predicate }
    }

    /// The expression tree.
    #[must_use]
    pub fn expr(&self) -> &CompiledExpr {
        &self.expr
    }

    /// Runs the closure.
    ///
    /// # Errors
    ///
    /// Propagates field read faults.
    pub fn eval(&self, target: &EvalTarget<'_>) -> Result<bool, EvalFault> {
        (self.predicate)(target)
    }
}

impl fmt::Debug for CompiledCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledCondition").field(&self.expr).finish()
    }
}

// ────────────────────────────────────────────
// Compiler
// ────────────────────────────────────────────

/// Compiles rule documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCompiler;

impl RuleCompiler {
    /// Creates a compiler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compiles every rule of `doc`, in order.
    ///
    /// The document is all-or-nothing: the first invalid rule aborts the
    /// whole compilation.
    ///
    /// # Errors
    ///
    /// Returns a [`Compile`](crate::ErrorKind::Compile) error for unknown
    /// fields, fields used with the wrong target, type mismatches, invalid
    /// patterns, unknown severities and duplicate rule ids.
    pub fn compile(&self, doc: &RulesDocumentAst) -> ArchResult<RuleSet> {
        let mut seen: HashMap<&str, &RuleAst> = HashMap::new();
        let mut rules = Vec::with_capacity(doc.rules.len());

        for ast in &doc.rules {
            if let Some(first) = seen.get(ast.id.as_str()) {
                return Err(ArchError::compile(format!("duplicate rule id `{}`", ast.id))
                    .with_location(ast.location())
                    .with_detail("rule", ast.id.as_str())
                    .with_detail("first_defined_at", first.location().to_string()));
            }
            seen.insert(&ast.id, ast);
            rules.push(compile_rule(ast)?);
        }

        debug!(rules = rules.len(), "compiled rules");
        Ok(RuleSet::new(rules))
    }
}

/// Compiles a document with the default compiler.
///
/// # Errors
///
/// See [`RuleCompiler::compile`].
pub fn compile(doc: &RulesDocumentAst) -> ArchResult<RuleSet> {
    RuleCompiler::new().compile(doc)
}

fn compile_rule(ast: &RuleAst) -> ArchResult<Rule> {
    let cx = Cx {
        rule: ast,
        target: ast.target(),
    };

    if let Some(within) = &ast.within {
        if within.target() != cx.target {
            return Err(cx.error(
                format!(
                    "`within` is written for {} targets but the rule targets {}",
                    within.target(),
                    cx.target
                ),
                ast.span,
            ));
        }
    }

    let severity = match &ast.severity {
        Some((name, span)) => name
            .parse::<Severity>()
            .map_err(|e| cx.error(e.to_string(), *span))?,
        None => ast.action.default_severity(),
    };

    let scope = ast
        .within
        .as_ref()
        .map(|w| cx.expr(w.expr()).map(CompiledCondition::new))
        .transpose()?;
    let condition = CompiledCondition::new(cx.expr(ast.when.expr())?);

    Ok(Rule {
        id: ast.id.clone(),
        name: ast.name.clone().unwrap_or_else(|| ast.id.clone()),
        description: ast.description.clone(),
        target: cx.target,
        action: ast.action,
        severity,
        message: ast.message.clone(),
        location: Some(ast.location()),
        mode: ast.action.match_mode(),
        scope,
        condition,
    })
}

struct Cx<'r> {
    rule: &'r RuleAst,
    target: RuleTarget,
}

impl Cx<'_> {
    fn error(&self, message: impl Into<String>, span: Span) -> ArchError {
        ArchError::compile(message)
            .with_location(span.location(self.rule.file.as_deref()))
            .with_detail("rule", self.rule.id.as_str())
    }

    fn field(&self, name: &str, span: Span) -> ArchResult<Field> {
        Field::resolve(name, self.target).map_err(|e| self.error(e.to_string(), span))
    }

    fn expr(&self, expr: &ExprAst) -> ArchResult<CompiledExpr> {
        match expr {
            ExprAst::And(l, r) => Ok(CompiledExpr::And(
                Box::new(self.expr(l)?),
                Box::new(self.expr(r)?),
            )),
            ExprAst::Or(l, r) => Ok(CompiledExpr::Or(
                Box::new(self.expr(l)?),
                Box::new(self.expr(r)?),
            )),
            ExprAst::Not(inner) => Ok(CompiledExpr::Not(Box::new(self.expr(inner)?))),
            ExprAst::Operand(operand) => self.bare_operand(operand),
            ExprAst::Compare {
                left,
                op,
                right,
                span,
            } => self.compare(left, *op, right, *span),
        }
    }

    fn bare_operand(&self, operand: &OperandAst) -> ArchResult<CompiledExpr> {
        match operand {
            OperandAst::Literal {
                value: LiteralAst::Bool(b),
                ..
            } => Ok(CompiledExpr::Const(*b)),
            OperandAst::Field(field) => {
                // Resolve first so an unknown name gets the better message.
                self.field(&field.name, field.span)?;
                Err(self.error(
                    format!(
                        "field `{}` is not a condition; compare it with a value",
                        field.name
                    ),
                    field.span,
                ))
            }
            other => Err(self.error(
                format!("`{other}` is not a condition"),
                other.span(),
            )),
        }
    }

    fn compare(
        &self,
        left: &OperandAst,
        op: CompareOp,
        right: &OperandAst,
        span: Span,
    ) -> ArchResult<CompiledExpr> {
        // Put the field on the left for symmetric operators.
        let (left, right) = match (left, right) {
            (OperandAst::Field(_), _) => (left, right),
            (_, OperandAst::Field(_)) if matches!(op, CompareOp::Eq | CompareOp::Ne) => {
                (right, left)
            }
            _ => {
                return Err(self.error(
                    format!("`{op}` needs a field on its left-hand side"),
                    span,
                ));
            }
        };
        let OperandAst::Field(field_ast) = left else {
            return Err(self.error("expected a field", left.span()));
        };
        let field = self.field(&field_ast.name, field_ast.span)?;

        if let OperandAst::Field(other) = right {
            let other_field = self.field(&other.name, other.span)?;
            return match op {
                CompareOp::Eq | CompareOp::Ne => Ok(CompiledExpr::FieldsEqual {
                    left: field,
                    right: other_field,
                    negate: op == CompareOp::Ne,
                }),
                _ => Err(self.error(
                    format!("`{op}` needs a literal on its right-hand side"),
                    other.span,
                )),
            };
        }

        let test = match op {
            CompareOp::Eq | CompareOp::Ne => {
                let OperandAst::Literal { value, span } = right else {
                    return Err(self.error(
                        format!("`{op}` compares with a single value; use `in` for lists"),
                        right.span(),
                    ));
                };
                let lit = self.literal_for(&field, value, *span)?;
                if op == CompareOp::Eq {
                    FieldTest::Eq(lit)
                } else {
                    FieldTest::Ne(lit)
                }
            }
            CompareOp::In | CompareOp::NotIn => {
                let OperandAst::List { items, span } = right else {
                    return Err(self.error(
                        format!("`{op}` expects a list on its right-hand side"),
                        right.span(),
                    ));
                };
                let list = items
                    .iter()
                    .map(|item| self.literal_for(&field, item, *span))
                    .collect::<ArchResult<Vec<_>>>()?;
                if op == CompareOp::In {
                    FieldTest::In(list)
                } else {
                    FieldTest::NotIn(list)
                }
            }
            CompareOp::Matches | CompareOp::RegexMatch => {
                let OperandAst::Literal {
                    value: LiteralAst::Str(pattern),
                    span: pattern_span,
                } = right
                else {
                    return Err(self.error(
                        format!("`{op}` needs a string pattern"),
                        right.span(),
                    ));
                };
                let compiled = if op == CompareOp::Matches {
                    GlobMatcher::new(pattern).map(FieldTest::Glob)
                } else {
                    RegexMatcher::new(pattern).map(FieldTest::Regex)
                };
                compiled.map_err(|e| {
                    self.error(e.to_string(), *pattern_span)
                        .with_detail("pattern", pattern.as_str())
                })?
            }
        };

        Ok(CompiledExpr::Test { field, test })
    }

    fn literal_for(&self, field: &Field, lit: &LiteralAst, span: Span) -> ArchResult<LiteralAst> {
        match lit {
            LiteralAst::Str(s) => Ok(LiteralAst::Str(field.canonical_literal(s))),
            other if field.is_string() => Err(self.error(
                format!("field `{field}` holds text and cannot be compared with {other}"),
                span,
            )),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ir::{IRNode, Language, SymbolKind};
    use crate::rules::parser::parse;

    fn compile_text(text: &str) -> ArchResult<RuleSet> {
        compile(&parse(text)?)
    }

    fn compile_err(text: &str) -> ArchError {
        compile_text(text).unwrap_err()
    }

    #[test]
    fn compiles_scenario_rule() {
        let set = compile_text(
            r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#,
        )
        .unwrap();
        let rule = &set.rules()[0];
        assert_eq!(rule.name, "no-domain-to-infra");
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(
            rule.condition().expr().to_string(),
            r#"src.layer = "domain" and dst.layer = "infrastructure""#
        );
    }

    #[test]
    fn default_severity_follows_action() {
        let set = compile_text(
            "rule a: warn node when true\nrule b: allow node when true\nrule c: deny node when true severity info",
        )
        .unwrap();
        let severities: Vec<_> = set.iter().map(|r| r.severity).collect();
        assert_eq!(severities, [Severity::Warning, Severity::Error, Severity::Info]);
    }

    #[test]
    fn unknown_field_is_located() {
        let err = compile_err(r#"rule r: deny node when colour = "red""#);
        assert_eq!(err.kind, ErrorKind::Compile);
        assert_eq!(err.location.as_ref().and_then(|l| l.column), Some(24));
        assert!(err.message.contains("unknown field `colour`"));
        assert_eq!(err.details["rule"], "r");
    }

    #[test]
    fn target_field_mismatch() {
        let err = compile_err(r#"rule r: deny dependency when layer = "domain""#);
        assert!(err.message.contains("cannot be used in dependency rules"));
        let err = compile_err(r#"rule r: deny node when dep_type = "call""#);
        assert!(err.message.contains("cannot be used in node rules"));
    }

    #[test]
    fn string_field_against_number() {
        let err = compile_err("rule r: deny node when layer = 3");
        assert!(err.message.contains("holds text"));
    }

    #[test]
    fn attr_fields_accept_any_literal() {
        assert!(compile_text("rule r: deny node when attr.loc = 3 or attr.public = true").is_ok());
    }

    #[test]
    fn in_requires_list() {
        let err = compile_err(r#"rule r: deny node when layer in "domain""#);
        assert!(err.message.contains("expects a list"));
    }

    #[test]
    fn patterns_are_validated() {
        let err = compile_err(r#"rule r: deny node when fqname =~ "(unclosed""#);
        assert!(err.message.contains("invalid regex"));
        assert_eq!(err.details["pattern"], "(unclosed");
        let err = compile_err("rule r: deny node when fqname matches layer");
        assert!(err.message.contains("needs a literal"));
    }

    #[test]
    fn bare_field_is_not_a_condition() {
        let err = compile_err("rule r: deny node when layer");
        assert!(err.message.contains("not a condition"));
    }

    #[test]
    fn unknown_severity() {
        let err = compile_err("rule r: deny node when true severity fatal");
        assert!(err.message.contains("unknown severity"));
    }

    #[test]
    fn duplicate_rule_ids_abort_the_document() {
        let err = compile_err("rule r: deny node when true\nrule r: warn node when false");
        assert!(err.message.contains("duplicate rule id"));
        assert_eq!(err.location.as_ref().and_then(|l| l.line), Some(2));
    }

    #[test]
    fn empty_document_compiles_to_empty_set() {
        assert!(compile_text("").unwrap().is_empty());
    }

    #[test]
    fn literal_on_the_left_is_swapped() {
        let set = compile_text(r#"rule r: deny node when "domain" = layer"#).unwrap();
        assert_eq!(set.rules()[0].condition().expr().to_string(), r#"layer = "domain""#);
    }

    #[test]
    fn enum_literals_are_folded() {
        let set = compile_text(r#"rule r: deny node when kind = "Class""#).unwrap();
        let node = IRNode::new(Language::Python, SymbolKind::Class, "a.B");
        assert!(set.rules()[0]
            .condition()
            .eval(&EvalTarget::Node(&node))
            .unwrap());
    }

    #[test]
    fn closure_agrees_with_tree() {
        let set = compile_text(
            r#"rule r: deny node when not (layer = "domain" or attr.public = true) and fqname matches "app.*""#,
        )
        .unwrap();
        let cond = set.rules()[0].condition();
        let nodes = [
            IRNode::new(Language::Python, SymbolKind::Class, "app.A").with_layer("domain"),
            IRNode::new(Language::Python, SymbolKind::Class, "app.B"),
            IRNode::new(Language::Python, SymbolKind::Class, "lib.C"),
            IRNode::new(Language::Python, SymbolKind::Class, "app.D").with_attribute("public", true),
        ];
        for node in &nodes {
            let target = EvalTarget::Node(node);
            assert_eq!(cond.eval(&target).unwrap(), cond.expr().eval(&target).unwrap());
        }
        let hits: Vec<_> = nodes
            .iter()
            .filter(|n| cond.eval(&EvalTarget::Node(n)).unwrap())
            .map(|n| n.fqname.as_str())
            .collect();
        assert_eq!(hits, ["app.B"]);
    }

    #[test]
    fn absent_fields_follow_sentinel_semantics() {
        let node = IRNode::new(Language::Python, SymbolKind::Class, "a.B");
        let target = EvalTarget::Node(&node);
        let eval = |text: &str| {
            compile_text(&format!("rule r: deny node when {text}")).unwrap().rules()[0]
                .condition()
                .eval(&target)
                .unwrap()
        };
        assert!(!eval(r#"layer = "x""#));
        assert!(eval(r#"layer != "x""#));
        assert!(!eval(r#"layer in ["x"]"#));
        assert!(eval(r#"layer not in ["x"]"#));
        assert!(!eval(r#"layer matches "*""#));
        assert!(!eval(r#"layer =~ ".*""#));
    }

    #[test]
    fn display_parenthesizes_mixed_operators() {
        let set = compile_text(
            r#"rule r: deny node when (layer = "a" or layer = "b") and not kind in ["class"]"#,
        )
        .unwrap();
        assert_eq!(
            set.rules()[0].condition().expr().to_string(),
            r#"(layer = "a" or layer = "b") and not kind in ["class"]"#
        );
    }
}
