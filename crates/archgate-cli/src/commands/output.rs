//! Shared output formatting for reports and diffs.

use std::fmt::Write as _;

use anyhow::Result;
use archgate::rules::{explain_violation, ViolationStatus};
use archgate::snapshot::SnapshotDiff;
use archgate::{Report, ReportedViolation, Severity};

use crate::OutputFormat;

/// Print a check report in the specified format.
pub fn print_report(report: &Report, format: OutputFormat, fail_on: Severity) -> Result<()> {
    let text = match format {
        OutputFormat::Text => render_text(report, fail_on),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Compact => render_compact(report),
    };
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}

/// Print a snapshot diff in the specified format.
pub fn print_diff(diff: &SnapshotDiff, from: &str, to: &str, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(diff)?,
        OutputFormat::Text | OutputFormat::Compact => render_diff(diff, from, to),
    };
    println!("{text}");
    Ok(())
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\x1b[31m",
        Severity::Warning => "\x1b[33m",
        Severity::Info => "\x1b[34m",
    }
}

fn status_tag(status: ViolationStatus) -> &'static str {
    match status {
        ViolationStatus::New => "[new] ",
        ViolationStatus::Existing => "[existing] ",
        ViolationStatus::Fixed => "[fixed] ",
        ViolationStatus::Unknown => "",
    }
}

fn render_text(report: &Report, fail_on: Severity) -> String {
    let mut out = String::new();

    for reported in &report.violations {
        let severity = reported.violation.rule.severity;
        let _ = writeln!(
            out,
            "{}{}{}\x1b[0m",
            severity_color(severity),
            status_tag(reported.status),
            explain_violation(&reported.violation)
        );
        out.push('\n');
    }

    if !report.fixed.is_empty() {
        let _ = writeln!(out, "\x1b[32mFixed since baseline:\x1b[0m");
        for violation in &report.fixed {
            let _ = writeln!(out, "  {} {}", violation.rule.id, violation.message);
        }
        out.push('\n');
    }

    for error in &report.errors {
        let _ = writeln!(out, "\x1b[31merror[{}]\x1b[0m: {error}", error.code);
    }

    if let Some(diff) = &report.diff {
        let _ = writeln!(
            out,
            "Graph vs {}: nodes +{} -{} ~{}, edges +{} -{} ~{}",
            diff.from,
            diff.nodes_added,
            diff.nodes_removed,
            diff.nodes_changed,
            diff.edges_added,
            diff.edges_removed,
            diff.edges_changed
        );
    }

    let summary = &report.summary;
    let blocking = summary.blocking(fail_on);
    let color = if blocking > 0 || report.has_fatal_errors() {
        "\x1b[31m"
    } else if summary.new > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    let count = |s: Severity| summary.by_severity.get(&s).copied().unwrap_or(0);
    let _ = write!(
        out,
        "{color}Found {} violation(s): {} error(s), {} warning(s), {} info(s); {} new, {} existing, {} fixed; {} blocking at {fail_on}\x1b[0m",
        summary.total,
        count(Severity::Error),
        count(Severity::Warning),
        count(Severity::Info),
        summary.new,
        summary.existing,
        summary.fixed,
        blocking,
    );
    out
}

fn compact_line(reported: &ReportedViolation) -> String {
    let v = &reported.violation;
    let at = v
        .location
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    format!(
        "{at}: {} [{}] {} ({})",
        v.rule.severity, v.rule.id, v.message, reported.status
    )
}

fn render_compact(report: &Report) -> String {
    report
        .violations
        .iter()
        .map(compact_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_diff(diff: &SnapshotDiff, from: &str, to: &str) -> String {
    let mut out = format!(
        "{from} -> {to}\n  nodes: +{} -{} ~{}\n  edges: +{} -{} ~{}",
        diff.nodes_added,
        diff.nodes_removed,
        diff.nodes_changed,
        diff.edges_added,
        diff.edges_removed,
        diff.edges_changed
    );
    let Some(details) = &diff.details else {
        return out;
    };
    for id in &details.nodes.added {
        let _ = write!(out, "\n  + node {id}");
    }
    for id in &details.nodes.removed {
        let _ = write!(out, "\n  - node {id}");
    }
    for change in &details.nodes.changed {
        let _ = write!(out, "\n  ~ node {}", change.id);
        for field in &change.fields {
            let _ = write!(
                out,
                "\n      {}: {} -> {}",
                field.field,
                field.before.as_deref().unwrap_or("-"),
                field.after.as_deref().unwrap_or("-")
            );
        }
    }
    for key in &details.edges.added {
        let _ = write!(out, "\n  + edge {key}");
    }
    for key in &details.edges.removed {
        let _ = write!(out, "\n  - edge {key}");
    }
    for change in &details.edges.changed {
        let _ = write!(out, "\n  ~ edge {}", change.edge);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgate::ir::{build_index, normalize, ArchitectureIR, IREdge, IRNode, Language, SourceLoc, SymbolKind};
    use archgate::rules::{compile_str, evaluate};
    use archgate::snapshot::SnapshotDiffEngine;
    use archgate::RunInfo;

    fn report() -> Report {
        let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.Svc")
            .with_layer("domain")
            .with_loc(SourceLoc::at("app/domain/svc.py", 4, 1));
        let db = IRNode::new(Language::Python, SymbolKind::Class, "app.infra.Db")
            .with_layer("infrastructure");
        let ir = normalize(ArchitectureIR::new(
            vec![svc.clone(), db.clone()],
            vec![IREdge::new(svc.id, db.id, archgate::ir::DepType::Call)],
        ));
        let rules = compile_str(
            r#"rule layering: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#,
        )
        .unwrap();
        let index = build_index(&ir).unwrap();
        let evaluation = evaluate(&rules, &index);
        Report::builder(RunInfo::default())
            .violations(evaluation.violations)
            .build()
    }

    #[test]
    fn compact_is_one_line_per_violation() {
        let text = render_compact(&report());
        assert_eq!(
            text,
            "app/domain/svc.py:4:1: error [layering] app.domain.Svc -> app.infra.Db (call) violates layering (unknown)"
        );
    }

    #[test]
    fn text_ends_with_summary() {
        let text = render_text(&report(), Severity::Error);
        assert!(text.contains("error[layering]: app.domain.Svc calls app.infra.Db"));
        assert!(text.contains("Found 1 violation(s): 1 error(s)"));
        assert!(text.contains("1 blocking at error"));
    }

    #[test]
    fn diff_lists_details() {
        let a = IRNode::new(Language::Rust, SymbolKind::Module, "a");
        let b = IRNode::new(Language::Rust, SymbolKind::Module, "b");
        let before = ArchitectureIR::new(vec![a.clone()], vec![]);
        let after = ArchitectureIR::new(vec![a, b], vec![]);
        let diff = SnapshotDiffEngine::new().diff_ir(&before, &after, true);

        let text = render_diff(&diff, "baseline", "latest");
        assert_eq!(
            text,
            "baseline -> latest\n  nodes: +1 -0 ~0\n  edges: +0 -0 ~0\n  + node rust:module:b"
        );
    }
}
