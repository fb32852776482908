//! # archgate-core
//!
//! Pure engine for architecture conformance checks.
//!
//! This crate has no filesystem or network access. It provides:
//!
//! - the [`ir`] graph model: canonical ids, merge of extractor fragments,
//!   normalization, validation, indexing and field selection
//! - the [`rules`] DSL: parser, compiler, evaluator, explanations and
//!   baseline comparison
//! - [`snapshot`] values and the structural diff between two of them
//! - [`report`] values for renderers
//!
//! ## Example
//!
//! ```
//! use archgate_core::ir::{build_index, normalize, ArchitectureIR, DepType, IREdge, IRNode, Language, SymbolKind};
//! use archgate_core::rules::{compile_str, evaluate};
//!
//! let svc = IRNode::new(Language::Python, SymbolKind::Class, "app.OrderService").with_layer("domain");
//! let repo = IRNode::new(Language::Python, SymbolKind::Class, "app.OrderRepo").with_layer("infrastructure");
//! let edge = IREdge::new(svc.id.clone(), repo.id.clone(), DepType::Call);
//! let ir = normalize(ArchitectureIR::new(vec![svc, repo], vec![edge]));
//!
//! let rules = compile_str(
//!     r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#,
//! )?;
//! let index = build_index(&ir)?;
//! let out = evaluate(&rules, &index);
//! assert_eq!(out.violations.len(), 1);
//! # Ok::<(), archgate_core::ArchError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod types;
mod violation;

pub mod ir;
pub mod report;
pub mod rules;
pub mod snapshot;

pub use error::{ArchError, ArchResult, ErrorKind, ErrorLocation};
pub use report::{DiffSummary, Report, ReportBuilder, ReportedViolation, RunInfo, Summary};
pub use types::{Severity, UnknownSeverity};
pub use violation::{
    DefaultViolationKeyStrategy, Violation, ViolationKey, ViolationKeyStrategy, ViolationTarget,
};
