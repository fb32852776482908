//! DTO → domain model conversion with validation.

use std::collections::BTreeMap;

use archgate_core::ir::GlobMatcher;

use super::dto::{ArchitectureModelDto, MappingDto};
use super::types::{ArchitectureModel, ElementName, Mapping, ModelError, PackagePrefix};

/// Errors during DTO → domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g. "layers[0].name").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// Cross-reference errors from aggregate root construction.
    #[error("architecture model errors:\n{}", format_errors(.0))]
    CrossRef(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts an [`ArchitectureModelDto`] to a validated [`ArchitectureModel`].
///
/// # Errors
///
/// Returns the first field-level error, or every cross-reference error at
/// once.
pub fn load(dto: ArchitectureModelDto) -> Result<ArchitectureModel, LoadError> {
    let layers = convert_mappings(dto.layers, "layers")?;
    let containers = convert_mappings(dto.containers, "containers")?;
    let contexts = convert_mappings(dto.contexts, "contexts")?;

    let mut dependencies = BTreeMap::new();
    for (from, to) in dto.dependencies {
        let ctx = format!("dependencies.{from}");
        let from = element_name(&from, &ctx)?;
        let to = to
            .iter()
            .enumerate()
            .map(|(i, name)| element_name(name, &format!("{ctx}[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        dependencies.insert(from, to);
    }

    ArchitectureModel::new(layers, containers, contexts, dependencies).map_err(LoadError::CrossRef)
}

fn convert_mappings(dtos: Vec<MappingDto>, section: &str) -> Result<Vec<Mapping>, LoadError> {
    dtos.into_iter()
        .enumerate()
        .map(|(i, dto)| convert_mapping(dto, &format!("{section}[{i}]")))
        .collect()
}

fn convert_mapping(dto: MappingDto, ctx: &str) -> Result<Mapping, LoadError> {
    let name = element_name(&dto.name, &format!("{ctx}.name"))?;

    let packages = dto
        .packages
        .iter()
        .enumerate()
        .map(|(j, p)| {
            PackagePrefix::new(p).map_err(|e| LoadError::Validation {
                context: format!("{ctx}.packages[{j}]"),
                source: e,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let paths = dto
        .paths
        .iter()
        .enumerate()
        .map(|(j, p)| {
            GlobMatcher::new(p).map_err(|e| LoadError::Validation {
                context: format!("{ctx}.paths[{j}]"),
                source: ModelError::InvalidGlob {
                    pattern: p.clone(),
                    reason: e.to_string(),
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Mapping::new(name, packages, paths, dto.description))
}

fn element_name(name: &str, context: &str) -> Result<ElementName, LoadError> {
    ElementName::new(name).map_err(|e| LoadError::Validation {
        context: context.to_string(),
        source: e,
    })
}
