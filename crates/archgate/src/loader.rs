//! Loading rule documents from disk.

use std::path::{Path, PathBuf};

use archgate_core::rules::{compile, DslParser, RuleSet, RulesDocumentAst};
use archgate_core::ArchError;
use tracing::debug;

/// File extension of rule documents found in directories.
pub const RULES_EXTENSION: &str = "rules";

/// The text of one rule document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    /// Where it was read from.
    pub path: PathBuf,
    /// UTF-8 content.
    pub text: String,
}

/// Errors while loading rule documents.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A rule path does not exist.
    #[error("rules path not found: {0}")]
    NotFound(PathBuf),

    /// A file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Walking a rules directory failed.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// Directory being walked.
        path: PathBuf,
        /// Walker error.
        source: ignore::Error,
    },

    /// Parsing or compiling failed.
    #[error(transparent)]
    Rules(#[from] ArchError),
}

/// Reads rule documents from files and directories.
///
/// A directory contributes every `*.rules` file below it (honoring
/// `.gitignore`), in path order. Explicit file paths are read regardless of
/// extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSourceLoader;

impl RuleSourceLoader {
    /// Creates a loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Loads the documents under `paths`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] for a missing path, or an IO error.
    pub fn load(&self, paths: &[PathBuf]) -> Result<Vec<RuleSource>, LoadError> {
        let mut sources = Vec::new();
        for path in paths {
            if path.is_dir() {
                for file in discover(path)? {
                    sources.push(read(&file)?);
                }
            } else if path.is_file() {
                sources.push(read(path)?);
            } else {
                return Err(LoadError::NotFound(path.clone()));
            }
        }
        debug!(documents = sources.len(), "loaded rule sources");
        Ok(sources)
    }
}

fn discover(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut builder = ignore::WalkBuilder::new(dir);
    builder.hidden(false).git_ignore(true).require_git(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|e| LoadError::Walk {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RULES_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn read(path: &Path) -> Result<RuleSource, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(RuleSource {
        path: path.to_path_buf(),
        text,
    })
}

/// Parses sources into one document, keeping source order.
///
/// # Errors
///
/// Returns the first parse error, located in its file.
pub fn parse_sources(sources: &[RuleSource]) -> Result<RulesDocumentAst, ArchError> {
    let parser = DslParser::new();
    let docs = sources
        .iter()
        .map(|s| parser.parse_named(&s.text, &s.path.to_string_lossy()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RulesDocumentAst::concat(docs))
}

/// Loads and parses the documents under `paths`.
///
/// # Errors
///
/// Returns IO errors and the first parse error.
pub fn load_documents(paths: &[PathBuf]) -> Result<RulesDocumentAst, LoadError> {
    let sources = RuleSourceLoader::new().load(paths)?;
    Ok(parse_sources(&sources)?)
}

/// Loads, parses and compiles the documents under `paths`.
///
/// # Errors
///
/// Returns IO errors, the first parse error or the first compile error.
pub fn load_rules(paths: &[PathBuf]) -> Result<RuleSet, LoadError> {
    let doc = load_documents(paths)?;
    Ok(compile(&doc)?)
}
