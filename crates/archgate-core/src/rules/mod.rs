//! The rule DSL pipeline.
//!
//! Three stages, each usable on its own:
//!
//! ```text
//! text ──parse──▶ RulesDocumentAst ──compile──▶ RuleSet ──evaluate(IRIndex)──▶ Evaluation
//! ```
//!
//! [`compile_str`] chains the first two for callers that do not need the
//! AST.

pub mod ast;
pub mod baseline;
pub mod compiler;
pub mod evaluator;
pub mod explain;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod types;

pub use ast::{
    CompareOp, DependencyWhenAst, ExprAst, FieldAst, LiteralAst, NodeWhenAst, OperandAst,
    RuleAst, RulesDocumentAst, Span, WhenAst,
};
pub use baseline::{BaselineComparer, BaselineResult, ViolationStatus};
pub use compiler::{compile, CompiledCondition, CompiledExpr, FieldTest, RuleCompiler};
pub use evaluator::{evaluate, Evaluation, RuleEvaluator};
pub use explain::{dep_verb, explain_rule, explain_violation};
pub use parser::{parse, DslParser};
pub use schema::{EvalFault, EvalTarget, Field, FieldError, NodeField, Value};
pub use types::{MatchMode, Rule, RuleAction, RuleRef, RuleSet, RuleTarget};

use crate::error::ArchResult;

/// Parses and compiles one rule document.
///
/// # Errors
///
/// Returns the parse error or the first compile error.
pub fn compile_str(text: &str) -> ArchResult<RuleSet> {
    compile(&parse(text)?)
}
