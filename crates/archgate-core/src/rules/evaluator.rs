//! Runs a [`RuleSet`] over an [`IRIndex`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::schema::{EvalFault, EvalTarget};
use super::types::{Rule, RuleSet, RuleTarget};
use crate::error::ArchError;
use crate::ir::{CanonicalId, IREdge, IRIndex, IRNode};
use crate::violation::{
    DefaultViolationKeyStrategy, Violation, ViolationKeyStrategy, ViolationTarget,
};

/// Outcome of evaluating a rule set.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Violations in rule order, then canonical target order.
    pub violations: Vec<Violation>,
    /// One entry per rule that had to be abandoned.
    pub errors: Vec<ArchError>,
}

/// Evaluates compiled rules against an indexed graph.
///
/// A rule that hits an [`EvalFault`] contributes no violations and one
/// [`Eval`](crate::ErrorKind::Eval) error; the remaining rules still run.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator<S = DefaultViolationKeyStrategy> {
    keys: S,
}

impl RuleEvaluator {
    /// Creates an evaluator with the default key strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ViolationKeyStrategy> RuleEvaluator<S> {
    /// Creates an evaluator with a custom key strategy.
    #[must_use]
    pub fn with_key_strategy(keys: S) -> Self {
        Self { keys }
    }

    /// Evaluates every rule in order.
    #[must_use]
    pub fn evaluate(&self, rules: &RuleSet, index: &IRIndex<'_>) -> Evaluation {
        let mut out = Evaluation::default();

        for rule in rules {
            match self.evaluate_rule(rule, index) {
                Ok(found) => {
                    debug!(rule = %rule.id, violations = found.len(), "evaluated rule");
                    out.violations.extend(found);
                }
                Err(fault) => {
                    warn!(rule = %rule.id, error = %fault, "rule evaluation aborted");
                    let mut err = ArchError::eval(format!("rule `{}`: {fault}", rule.id))
                        .with_detail("rule", rule.id.as_str());
                    if let EvalFault::MissingEndpoint { missing, .. } = &fault {
                        err = err.with_detail("missing", missing.as_str());
                    }
                    if let Some(location) = &rule.location {
                        err = err.with_location(location.clone());
                    }
                    out.errors.push(err);
                }
            }
        }

        out
    }

    /// Evaluates one rule.
    ///
    /// # Errors
    ///
    /// Returns the first fault; violations found before it are discarded.
    pub fn evaluate_rule(
        &self,
        rule: &Rule,
        index: &IRIndex<'_>,
    ) -> Result<Vec<Violation>, EvalFault> {
        let mut found = Vec::new();
        match rule.target {
            RuleTarget::Node => {
                for node in index.nodes() {
                    if rule.is_violated_by(&EvalTarget::Node(node))? {
                        found.push(self.node_violation(rule, node));
                    }
                }
            }
            RuleTarget::Dependency => {
                for edge in index.edges() {
                    let (src, dst) = resolve_endpoints(index, edge)?;
                    let target = EvalTarget::Dependency { edge, src, dst };
                    if rule.is_violated_by(&target)? {
                        found.push(self.edge_violation(rule, edge, src, dst));
                    }
                }
            }
        }
        Ok(found)
    }

    fn node_violation(&self, rule: &Rule, node: &IRNode) -> Violation {
        let mut context = BTreeMap::new();
        context.insert("target".to_string(), "node".to_string());
        context.insert("rule_id".to_string(), rule.id.clone());
        context.insert("node_id".to_string(), node.id.to_string());
        context.insert("fqname".to_string(), node.fqname.clone());
        context.insert("kind".to_string(), node.kind.to_string());
        context.insert("language".to_string(), node.language.to_string());
        insert_opt(&mut context, "layer", node.layer.as_deref());
        insert_opt(&mut context, "container", node.container.as_deref());
        insert_opt(&mut context, "context", node.context.as_deref());
        insert_opt(&mut context, "file", node.file());

        let message = match &rule.message {
            Some(template) => render(template, &context),
            None => format!("{} violates {}", node.fqname, rule.name),
        };
        let target = ViolationTarget::Node {
            id: node.id.clone(),
        };

        Violation {
            rule: rule.to_ref(),
            key: self.keys.key(&rule.id, &target),
            target,
            message,
            context,
            location: node.loc.clone(),
        }
    }

    fn edge_violation(&self, rule: &Rule, edge: &IREdge, src: &IRNode, dst: &IRNode) -> Violation {
        let mut context = BTreeMap::new();
        context.insert("target".to_string(), "dependency".to_string());
        context.insert("rule_id".to_string(), rule.id.clone());
        context.insert("dep_type".to_string(), edge.dep_type.to_string());
        for (prefix, node) in [("src", src), ("dst", dst)] {
            context.insert(format!("{prefix}_id"), node.id.to_string());
            context.insert(format!("{prefix}_fqname"), node.fqname.clone());
            insert_opt(&mut context, &format!("{prefix}_layer"), node.layer.as_deref());
            insert_opt(&mut context, &format!("{prefix}_container"), node.container.as_deref());
            insert_opt(&mut context, &format!("{prefix}_context"), node.context.as_deref());
        }

        let arrow = format!("{} -> {}", src.fqname, dst.fqname);
        let message = match &rule.message {
            Some(template) => format!("{}: {arrow}", render(template, &context)),
            None => format!("{arrow} ({}) violates {}", edge.dep_type, rule.name),
        };
        let target = ViolationTarget::Dependency {
            src: edge.src.clone(),
            dst: edge.dst.clone(),
            dep_type: edge.dep_type.clone(),
        };

        Violation {
            rule: rule.to_ref(),
            key: self.keys.key(&rule.id, &target),
            target,
            message,
            context,
            location: edge.loc.clone().or_else(|| src.loc.clone()),
        }
    }
}

/// Evaluates with the default evaluator.
#[must_use]
pub fn evaluate(rules: &RuleSet, index: &IRIndex<'_>) -> Evaluation {
    RuleEvaluator::new().evaluate(rules, index)
}

fn resolve_endpoints<'a>(
    index: &IRIndex<'a>,
    edge: &IREdge,
) -> Result<(&'a IRNode, &'a IRNode), EvalFault> {
    let lookup = |id: &CanonicalId| {
        index.node(id).ok_or_else(|| EvalFault::MissingEndpoint {
            edge: edge.key(),
            missing: id.clone(),
        })
    };
    Ok((lookup(&edge.src)?, lookup(&edge.dst)?))
}

fn insert_opt(context: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        context.insert(key.to_string(), value.to_string());
    }
}

/// Replaces `{key}` placeholders with context values. Unknown keys stay.
///
/// The template is scanned once, so substituted values are never expanded.
fn render(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match context.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ir::{
        build_index, normalize, ArchitectureIR, DanglingEdges, DepType, IrNormalizer,
        Language, NormalizeOptions, SourceLoc, SymbolKind,
    };
    use crate::rules::{compile, parse};

    fn ruleset(text: &str) -> RuleSet {
        compile(&parse(text).unwrap()).unwrap()
    }

    fn layered() -> ArchitectureIR {
        let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.OrderService")
            .with_layer("domain")
            .with_loc(SourceLoc::at("app/domain/service.py", 5, 1));
        let repo = IRNode::new(Language::Python, SymbolKind::Class, "app.infra.OrderRepo")
            .with_layer("infrastructure");
        let api = IRNode::new(Language::Python, SymbolKind::Module, "app.api")
            .with_layer("presentation");
        normalize(ArchitectureIR::new(
            vec![svc.clone(), repo.clone(), api.clone()],
            vec![
                IREdge::new(svc.id.clone(), repo.id.clone(), DepType::Call),
                IREdge::new(api.id.clone(), svc.id.clone(), DepType::Import),
                IREdge::new(api.id, repo.id, DepType::Import),
            ],
        ))
    }

    #[test]
    fn deny_dependency_reports_matching_edge() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#,
        );
        let out = evaluate(&rules, &index);
        assert!(out.errors.is_empty());
        assert_eq!(out.violations.len(), 1);
        let v = &out.violations[0];
        assert_eq!(
            v.message,
            "app.domain.OrderService -> app.infra.OrderRepo (call) violates no-domain-to-infra"
        );
        assert_eq!(v.context["src_layer"], "domain");
        assert_eq!(v.context["dep_type"], "call");
        assert_eq!(v.location.as_ref().map(|l| l.file.as_str()), Some("app/domain/service.py"));
    }

    #[test]
    fn allow_rule_flags_targets_outside_the_allowed_set() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule presentation-deps: allow dependency
                 within src.layer = "presentation"
                 when dst.layer in ["application", "domain"]"#,
        );
        let out = evaluate(&rules, &index);
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.violations[0].context["dst_layer"], "infrastructure");
    }

    #[test]
    fn node_rule_with_custom_message() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule modules-in-presentation: warn node when kind = "module" message "{fqname} is a loose module""#,
        );
        let out = evaluate(&rules, &index);
        assert_eq!(out.violations.len(), 1);
        let v = &out.violations[0];
        assert_eq!(v.message, "app.api is a loose module");
        assert_eq!(v.key.as_str(), "modules-in-presentation|node|python:module:app.api");
        assert_eq!(v.rule.severity, crate::types::Severity::Warning);
    }

    #[test]
    fn custom_dependency_message_gets_the_arrow() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule r: deny dependency when dep_type = "call" message "no calls""#,
        );
        let out = evaluate(&rules, &index);
        assert_eq!(
            out.violations[0].message,
            "no calls: app.domain.OrderService -> app.infra.OrderRepo"
        );
    }

    #[test]
    fn violations_follow_rule_then_target_order() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            "rule b: deny dependency when true\nrule a: deny node when true",
        );
        let out = evaluate(&rules, &index);
        let rule_ids: Vec<_> = out.violations.iter().map(|v| v.rule.id.as_str()).collect();
        assert_eq!(rule_ids, ["b", "b", "b", "a", "a", "a"]);
        let node_keys: Vec<_> = out.violations[3..].iter().map(|v| v.key.clone()).collect();
        let mut sorted = node_keys.clone();
        sorted.sort();
        assert_eq!(node_keys, sorted);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let ir = layered();
        let index = build_index(&ir).unwrap();
        let rules = ruleset("rule a: deny dependency when dep_type = \"import\"");
        let first = evaluate(&rules, &index).violations;
        let second = evaluate(&rules, &index).violations;
        assert_eq!(first, second);
    }

    #[test]
    fn missing_endpoint_aborts_only_that_rule() {
        let a = IRNode::new(Language::Go, SymbolKind::Package, "a");
        let ir = IrNormalizer::new(NormalizeOptions {
            dangling: DanglingEdges::Keep,
        })
        .normalize(ArchitectureIR::new(
            vec![a.clone()],
            vec![IREdge::new(a.id.clone(), CanonicalId::from("go:package:ghost"), DepType::Import)],
        ))
        .ir;
        let index = build_index(&ir).unwrap();
        let rules = ruleset("rule deps: deny dependency when true\nrule nodes: deny node when true");
        let out = evaluate(&rules, &index);

        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].kind, ErrorKind::Eval);
        assert_eq!(out.errors[0].details["rule"], "deps");
        assert_eq!(out.errors[0].details["missing"], "go:package:ghost");
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.violations[0].rule.id, "nodes");
    }

    #[test]
    fn removing_the_edge_removes_the_violation() {
        let mut ir = layered();
        ir.edges.retain(|e| e.dep_type != DepType::Call);
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#,
        );
        assert!(evaluate(&rules, &index).violations.is_empty());
    }

    #[test]
    fn render_does_not_expand_substituted_values() {
        let context: BTreeMap<String, String> = [
            ("fqname".to_string(), "weird.{layer}".to_string()),
            ("layer".to_string(), "domain".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            render("{fqname} in {layer} {unknown} {open", &context),
            "weird.{layer} in domain {unknown} {open"
        );
    }
}
