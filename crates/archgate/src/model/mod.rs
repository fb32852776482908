//! Architecture model driven by `architecture.toml`.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! dto types
//!   ↓ validate + convert
//! ArchitectureModel (pure domain model)
//!   ├─ ModelResolver   fills node layer/container/context
//!   └─ layer_rules()   synthetic `allow dependency` rules
//! ```

use std::path::{Path, PathBuf};

pub mod dto;
pub mod loader;
pub mod resolver;
pub mod types;

pub use loader::LoadError;
pub use resolver::{ModelResolver, Resolution};
pub use types::{ArchitectureModel, ElementKind, ElementName, Mapping, ModelError, PackagePrefix};

/// Errors from reading and loading an architecture model.
#[derive(Debug, thiserror::Error)]
pub enum LoadModelError {
    /// The file could not be read.
    #[error("failed to read architecture model {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Domain model validation failed.
    #[error("{0}")]
    Load(#[from] LoadError),
}

impl ArchitectureModel {
    /// Parses and validates a model.
    ///
    /// # Errors
    ///
    /// Returns an error if TOML parsing or model validation fails.
    pub fn from_toml(content: &str) -> Result<Self, LoadModelError> {
        let dto: dto::ArchitectureModelDto = toml::from_str(content)?;
        Ok(loader::load(dto)?)
    }

    /// Reads, parses and validates a model file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, LoadModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }
}
