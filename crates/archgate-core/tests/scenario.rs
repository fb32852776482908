//! End-to-end: DSL text to violations to baseline classification.

use archgate_core::ir::{
    build_index, ArchitectureIR, DepType, IREdge, IRNode, IrMerger, Language, SourceLoc,
    SymbolKind,
};
use archgate_core::rules::{compile, compile_str, evaluate, BaselineComparer, DslParser, RulesDocumentAst};
use archgate_core::{ErrorKind, ViolationTarget};

const SCENARIO: &str = r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#;

fn order_graph(service_line: u32) -> ArchitectureIR {
    let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.OrderService")
        .with_layer("domain")
        .with_loc(SourceLoc::at("app/domain/order_service.py", service_line, 1));
    let repo = IRNode::new(Language::Python, SymbolKind::Class, "app.infra.OrderRepo")
        .with_layer("infrastructure");
    let edge = IREdge::new(svc.id.clone(), repo.id.clone(), DepType::Call)
        .with_loc(SourceLoc::at("app/domain/order_service.py", service_line + 4, 9));
    IrMerger::new()
        .merge([ArchitectureIR::new(vec![svc, repo], vec![edge])])
        .expect("no conflicts")
}

#[test]
fn scenario_rule_yields_one_keyed_violation() {
    let rules = compile_str(SCENARIO).expect("scenario compiles");
    let ir = order_graph(10);
    let index = build_index(&ir).expect("normalized graph indexes");

    let out = evaluate(&rules, &index);
    assert!(out.errors.is_empty());
    assert_eq!(out.violations.len(), 1);

    let v = &out.violations[0];
    assert_eq!(
        v.key.as_str(),
        "no-domain-to-infra|dependency|python:class:app.domain.OrderService|python:class:app.infra.OrderRepo|call"
    );
    match &v.target {
        ViolationTarget::Dependency { dep_type, .. } => assert_eq!(dep_type, &DepType::Call),
        other => panic!("unexpected target {other:?}"),
    }
}

#[test]
fn line_moves_keep_the_violation_accepted() {
    let rules = compile_str(SCENARIO).unwrap();

    let t0 = order_graph(10);
    let before = evaluate(&rules, &build_index(&t0).unwrap()).violations;
    let t1 = order_graph(57);
    let after = evaluate(&rules, &build_index(&t1).unwrap()).violations;

    assert_ne!(before[0].location, after[0].location);
    let result = BaselineComparer::new().compare(&before, &after);
    assert!(result.new.is_empty());
    assert_eq!(result.accepted.len(), 1);
    assert!(result.fixed.is_empty());
}

#[test]
fn documents_concatenate_in_load_order() {
    let parser = DslParser::new();
    let first = parser
        .parse_named(SCENARIO, "layers.rules")
        .unwrap();
    let second = parser
        .parse_named(r#"rule no-loose-modules: warn node when kind = "module""#, "nodes.rules")
        .unwrap();
    let rules = compile(&RulesDocumentAst::concat([first, second])).unwrap();
    let ids: Vec<_> = rules.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["no-domain-to-infra", "no-loose-modules"]);
}

#[test]
fn one_bad_rule_rejects_the_whole_set() {
    let parser = DslParser::new();
    let good = parser.parse_named(SCENARIO, "good.rules").unwrap();
    let bad = parser
        .parse_named(r#"rule broken: deny node when src.layer = "domain""#, "bad.rules")
        .unwrap();
    let err = compile(&RulesDocumentAst::concat([good, bad])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(
        err.location.as_ref().and_then(|l| l.file.as_deref()),
        Some("bad.rules")
    );
}

#[test]
fn parse_errors_carry_file_and_position() {
    let err = DslParser::new()
        .parse_named("rule x: deny dependency\nwhen src.layer = ", "arch.rules")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    let loc = err.location.expect("located");
    assert_eq!(loc.file.as_deref(), Some("arch.rules"));
    assert_eq!(loc.line, Some(2));
}

#[test]
fn kind_conflicts_abort_the_merge() {
    let a = IRNode::new(Language::Python, SymbolKind::Class, "app.Thing");
    let mut b = a.clone();
    b.kind = SymbolKind::Function;
    let err = IrMerger::new()
        .merge([
            ArchitectureIR::new(vec![a], vec![]),
            ArchitectureIR::new(vec![b], vec![]),
        ])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MergeConflict);
    assert!(err.is_fatal());
    assert_eq!(err.details["field"], "kind");
}
