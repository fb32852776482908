//! Structured error type shared by every stage of the pipeline.
//!
//! Errors are a single tagged record rather than a hierarchy: the
//! [`ErrorKind`] says which stage failed, and the remaining fields carry
//! everything a CLI or CI integration needs to render the problem without
//! parsing strings.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which stage produced an [`ArchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed rule DSL text.
    Parse,
    /// Well-formed rules that are semantically invalid.
    Compile,
    /// Internal inconsistency found while evaluating a rule.
    Eval,
    /// Irreconcilable duplicate identity across IR fragments.
    MergeConflict,
    /// Duplicate identities reached the indexer.
    IndexContract,
}

impl ErrorKind {
    /// Returns the stable machine-readable code for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Parse => "rules_parse_error",
            Self::Compile => "rules_compile_error",
            Self::Eval => "rules_eval_error",
            Self::MergeConflict => "merge_conflict",
            Self::IndexContract => "index_contract_violation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Position of an error in a rule source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// Source file (or logical source name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Column number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl ErrorLocation {
    /// Creates a location at `line:column` without a file.
    #[must_use]
    pub fn at(line: usize, column: usize) -> Self {
        Self {
            file: None,
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Mirrors `file:line:column`, dropping the trailing parts that are unknown.
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => write!(f, "{file}:{line}:{col}"),
            (Some(file), Some(line), None) => write!(f, "{file}:{line}"),
            (Some(file), None, _) => write!(f, "{file}"),
            (None, Some(line), Some(col)) => write!(f, "{line}:{col}"),
            (None, Some(line), None) => write!(f, "{line}"),
            (None, None, _) => Ok(()),
        }
    }
}

/// An error raised anywhere in the core pipeline.
///
/// Displays as `file:line:column: message`, dropping unknown location parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{prefix}{message}", prefix = location_prefix(.location.as_ref()))]
pub struct ArchError {
    /// Stage that failed.
    pub kind: ErrorKind,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional source location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
    /// Extra structured details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ArchError {
    /// Creates an error of the given kind with its default code.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            message: message.into(),
            location: None,
            details: BTreeMap::new(),
        }
    }

    /// Shorthand for a [`ErrorKind::Parse`] error at `line:column`.
    #[must_use]
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(ErrorKind::Parse, message).with_location(ErrorLocation::at(line, column))
    }

    /// Shorthand for a [`ErrorKind::Compile`] error.
    #[must_use]
    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Compile, message)
    }

    /// Shorthand for a [`ErrorKind::Eval`] error.
    #[must_use]
    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Eval, message)
    }

    /// Shorthand for a [`ErrorKind::MergeConflict`] error.
    #[must_use]
    pub fn merge_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MergeConflict, message)
    }

    /// Shorthand for a [`ErrorKind::IndexContract`] error.
    #[must_use]
    pub fn index_contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexContract, message)
    }

    /// Attaches a location.
    #[must_use]
    pub fn with_location(mut self, location: ErrorLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the file of the location, creating one if needed.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.location.get_or_insert_with(ErrorLocation::default).file = Some(file.into());
        self
    }

    /// Adds a structured detail.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Upstream data-integrity failures abort the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::MergeConflict | ErrorKind::IndexContract)
    }
}

fn location_prefix(location: Option<&ErrorLocation>) -> String {
    match location.map(ToString::to_string) {
        Some(loc) if !loc.is_empty() => format!("{loc}: "),
        _ => String::new(),
    }
}

/// The code is per instance, so it cannot come from `#[diagnostic(code(..))]`.
impl Diagnostic for ArchError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.details
            .get("help")
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }
}

/// Convenience alias for core results.
pub type ArchResult<T> = Result<T, ArchError>;
