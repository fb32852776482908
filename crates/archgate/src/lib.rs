//! # archgate
//!
//! Architecture conformance checks over dependency graphs.
//!
//! This is the facade crate: it re-exports [`archgate_core`] and adds the
//! parts that touch the filesystem.
//!
//! ## Quick Start
//!
//! ```text
//! build/ir/*.json      fragments written by extractors
//! architecture.toml    layers, containers, contexts, allowed dependencies
//! archgate.rules       rule DSL
//! archgate.toml        where to find all of the above
//! ```
//!
//! ```rust,no_run
//! use archgate::{Config, Engine, Severity};
//!
//! let root = std::path::Path::new(".");
//! let config = Config::from_file(&root.join("archgate.toml"))?.resolve(root)?;
//! let report = Engine::new(config).check()?;
//! if report.summary.blocking(Severity::Error) > 0 {
//!     std::process::exit(1);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use archgate_core::*;

pub mod config;
pub mod engine;
pub mod fragments;
pub mod loader;
pub mod model;
pub mod store;

pub use config::{Config, ConfigError, EngineConfig};
pub use engine::{Checked, Engine, EngineError};
pub use fragments::{FragmentError, FragmentLoader};
pub use loader::{load_documents, load_rules, LoadError, RuleSource, RuleSourceLoader};
pub use model::{ArchitectureModel, ModelResolver};
pub use store::{FsSnapshotStore, StoreError};
