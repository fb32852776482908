//! TOML deserialization types for `architecture.toml`.
//!
//! These types exist solely for serde deserialization. They are converted
//! to [`ArchitectureModel`](super::ArchitectureModel) by the loader.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Raw architecture model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchitectureModelDto {
    /// Layer definitions.
    #[serde(default)]
    pub layers: Vec<MappingDto>,
    /// Container definitions.
    #[serde(default)]
    pub containers: Vec<MappingDto>,
    /// Bounded-context definitions.
    #[serde(default)]
    pub contexts: Vec<MappingDto>,
    /// Allowed layer dependencies: layer name to the layers it may use.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

/// One named mapping from code to an architecture element.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingDto {
    /// Element name (e.g. "domain").
    pub name: String,
    /// Fully-qualified name prefixes.
    #[serde(default)]
    pub packages: Vec<String>,
    /// File path globs.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty() {
        let dto: ArchitectureModelDto = toml::from_str("").unwrap();
        assert!(dto.layers.is_empty());
        assert!(dto.dependencies.is_empty());
    }

    #[test]
    fn deserialize_full_model() {
        let dto: ArchitectureModelDto = toml::from_str(
            r#"
[[layers]]
name = "domain"
packages = ["app.domain"]

[[layers]]
name = "infrastructure"
paths = ["app/infra/**"]
description = "Adapters"

[[containers]]
name = "backend"
packages = ["app"]

[dependencies]
infrastructure = ["domain"]
"#,
        )
        .unwrap();
        assert_eq!(dto.layers.len(), 2);
        assert_eq!(dto.layers[1].paths, ["app/infra/**"]);
        assert_eq!(dto.containers[0].packages, ["app"]);
        assert_eq!(dto.dependencies["infrastructure"], ["domain"]);
    }
}
