//! Human-readable explanations of rules and violations.

use std::fmt::Write as _;

use super::types::{Rule, RuleTarget};
use crate::ir::DepType;
use crate::violation::{Violation, ViolationTarget};

/// Verb phrase for a dependency type, as in "A calls B".
#[must_use]
pub fn dep_verb(dep_type: &DepType) -> String {
    match dep_type {
        DepType::Import => "imports".into(),
        DepType::Call => "calls".into(),
        DepType::Inherit => "inherits from".into(),
        DepType::Implement => "implements".into(),
        DepType::Instantiate => "instantiates".into(),
        DepType::Use => "uses".into(),
        DepType::Reference => "references".into(),
        DepType::Contain => "contains".into(),
        DepType::Other(other) => format!("depends on ({other})"),
    }
}

/// Explains one violation over a few lines.
///
/// Only the violation's own record is used, so this works for violations
/// loaded from a stored baseline as well.
#[must_use]
pub fn explain_violation(violation: &Violation) -> String {
    let ctx = |key: &str| violation.context.get(key).map(String::as_str);
    let rule = &violation.rule;
    let mut out = String::new();

    match &violation.target {
        ViolationTarget::Node { id } => {
            let fqname = ctx("fqname").unwrap_or(id.as_str());
            let _ = writeln!(out, "{}[{}]: {fqname}", rule.severity, rule.id);
            let _ = writeln!(out, "  rule: {} ({} {})", rule.name, rule.action, rule.target);
            let mut facts = Vec::new();
            if let Some(kind) = ctx("kind") {
                facts.push(kind.to_string());
            }
            for key in ["layer", "container", "context"] {
                if let Some(value) = ctx(key) {
                    facts.push(format!("{key} {value}"));
                }
            }
            if !facts.is_empty() {
                let _ = writeln!(out, "  node: {}", facts.join(", "));
            }
        }
        ViolationTarget::Dependency { src, dst, dep_type } => {
            let src_name = ctx("src_fqname").unwrap_or(src.as_str());
            let dst_name = ctx("dst_fqname").unwrap_or(dst.as_str());
            let _ = writeln!(
                out,
                "{}[{}]: {src_name} {} {dst_name}",
                rule.severity,
                rule.id,
                dep_verb(dep_type)
            );
            let _ = writeln!(out, "  rule: {} ({} {})", rule.name, rule.action, rule.target);
            for key in ["layer", "container", "context"] {
                let from = ctx(&format!("src_{key}"));
                let to = ctx(&format!("dst_{key}"));
                if from.is_some() || to.is_some() {
                    let _ = writeln!(
                        out,
                        "  {key}: {} -> {}",
                        from.unwrap_or("-"),
                        to.unwrap_or("-")
                    );
                }
            }
        }
    }

    if let Some(loc) = &violation.location {
        let _ = writeln!(out, "  at: {loc}");
    }
    let _ = write!(out, "  note: {}", violation.message);
    out
}

/// Explains a compiled rule: header, description and conditions.
#[must_use]
pub fn explain_rule(rule: &Rule) -> String {
    let targets = match rule.target {
        RuleTarget::Node => "nodes",
        RuleTarget::Dependency => "dependencies",
    };
    let mut out = format!(
        "[{}] {} - {} {targets} ({})",
        rule.id, rule.name, rule.action, rule.severity
    );
    if let Some(description) = &rule.description {
        let _ = write!(out, "\n  {description}");
    }
    if let Some(scope) = rule.scope() {
        let _ = write!(out, "\n  within: {}", scope.expr());
    }
    let _ = write!(out, "\n  when: {}", rule.condition().expr());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{build_index, normalize, ArchitectureIR, IREdge, IRNode, Language, SourceLoc, SymbolKind};
    use crate::rules::{compile, evaluate, parse, RuleSet};

    fn ruleset(text: &str) -> RuleSet {
        compile(&parse(text).unwrap()).unwrap()
    }

    fn graph() -> ArchitectureIR {
        let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.OrderService")
            .with_layer("domain")
            .with_loc(SourceLoc::at("app/domain/service.py", 12, 5));
        let repo = IRNode::new(Language::Python, SymbolKind::Class, "app.infra.OrderRepo")
            .with_layer("infrastructure");
        normalize(ArchitectureIR::new(
            vec![svc.clone(), repo.clone()],
            vec![IREdge::new(svc.id, repo.id, DepType::Call)],
        ))
    }

    #[test]
    fn verbs_cover_known_types() {
        assert_eq!(dep_verb(&DepType::Inherit), "inherits from");
        assert_eq!(dep_verb(&DepType::Contain), "contains");
        assert_eq!(dep_verb(&DepType::from("annotates")), "depends on (annotates)");
    }

    #[test]
    fn explains_dependency_violation() {
        let ir = graph();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(
            r#"rule no-domain-to-infra "Domain stays pure": deny dependency
                 when src.layer = "domain" and dst.layer = "infrastructure""#,
        );
        let out = evaluate(&rules, &index);
        let text = explain_violation(&out.violations[0]);
        insta::assert_snapshot!(text, @r"
        error[no-domain-to-infra]: app.domain.OrderService calls app.infra.OrderRepo
          rule: Domain stays pure (deny dependency)
          layer: domain -> infrastructure
          at: app/domain/service.py:12:5
          note: app.domain.OrderService -> app.infra.OrderRepo (call) violates Domain stays pure
        ");
    }

    #[test]
    fn explains_node_violation() {
        let ir = graph();
        let index = build_index(&ir).unwrap();
        let rules = ruleset(r#"rule repo-naming: warn node when name =~ "Repo$""#);
        let out = evaluate(&rules, &index);
        let text = explain_violation(&out.violations[0]);
        insta::assert_snapshot!(text, @r"
        warning[repo-naming]: app.infra.OrderRepo
          rule: repo-naming (warn node)
          node: class, layer infrastructure
          note: app.infra.OrderRepo violates repo-naming
        ");
    }

    #[test]
    fn explains_rule_with_scope() {
        let rules = ruleset(
            r#"rule presentation-deps: allow dependency
                 within src.layer = "presentation"
                 when dst.layer in ["application", "domain"] or dep_type = "import"
                 severity warning
                 description "Presentation talks to the application core only""#,
        );
        let text = explain_rule(&rules.rules()[0]);
        insta::assert_snapshot!(text, @r#"
        [presentation-deps] presentation-deps - allow dependencies (warning)
          Presentation talks to the application core only
          within: src.layer = "presentation"
          when: dst.layer in ["application", "domain"] or dep_type = "import"
        "#);
    }
}
