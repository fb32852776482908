//! Pure domain model of the architecture description.
//!
//! No serde, no I/O. Invariants are enforced at construction time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use archgate_core::ir::{GlobMatcher, IRNode};
use archgate_core::rules::{
    CompareOp, ExprAst, LiteralAst, OperandAst, RuleAction, RuleAst, RuleTarget,
    RulesDocumentAst, Span, WhenAst,
};

// ────────────────────────────────────────────
// Newtypes with validation
// ────────────────────────────────────────────

/// A validated element name (non-empty, `[A-Za-z0-9_-]` only).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementName(String);

impl ElementName {
    /// Creates a new element name.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or contains invalid characters.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ModelError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-qualified name prefix such as `app.domain` or `crate::infra`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePrefix(String);

const SEPARATORS: &[&str] = &[".", "::", "/"];

impl PackagePrefix {
    /// Creates a prefix. Trailing separators are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if nothing is left after trimming.
    pub fn new(prefix: &str) -> Result<Self, ModelError> {
        let mut trimmed = prefix.trim();
        while let Some(sep) = SEPARATORS.iter().find(|s| trimmed.ends_with(*s)) {
            trimmed = &trimmed[..trimmed.len() - sep.len()];
        }
        if trimmed.is_empty() {
            return Err(ModelError::EmptyPackage {
                prefix: prefix.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Length of the match if `fqname` is this prefix or lies below it at a
    /// segment boundary.
    #[must_use]
    pub fn match_len(&self, fqname: &str) -> Option<usize> {
        let rest = fqname.strip_prefix(self.0.as_str())?;
        if rest.is_empty() || SEPARATORS.iter().any(|s| rest.starts_with(s)) {
            Some(self.0.len())
        } else {
            None
        }
    }

    /// Returns the prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ────────────────────────────────────────────
// Domain entities
// ────────────────────────────────────────────

/// Kind of architecture element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `[[layers]]`
    Layer,
    /// `[[containers]]`
    Container,
    /// `[[contexts]]`
    Context,
}

impl ElementKind {
    /// Singular lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Layer => "layer",
            Self::Container => "container",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named element and the code it covers.
#[derive(Debug, Clone)]
pub struct Mapping {
    name: ElementName,
    packages: Vec<PackagePrefix>,
    paths: Vec<GlobMatcher>,
    description: Option<String>,
}

impl Mapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(
        name: ElementName,
        packages: Vec<PackagePrefix>,
        paths: Vec<GlobMatcher>,
        description: Option<String>,
    ) -> Self {
        Self {
            name,
            packages,
            paths,
            description,
        }
    }

    /// Returns the element name.
    #[must_use]
    pub fn name(&self) -> &ElementName {
        &self.name
    }

    /// Returns the package prefixes.
    #[must_use]
    pub fn packages(&self) -> &[PackagePrefix] {
        &self.packages
    }

    /// Returns the path globs.
    #[must_use]
    pub fn paths(&self) -> &[GlobMatcher] {
        &self.paths
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Longest package prefix covering `fqname`.
    #[must_use]
    pub fn package_match(&self, fqname: &str) -> Option<usize> {
        self.packages.iter().filter_map(|p| p.match_len(fqname)).max()
    }

    /// Tests whether a file path is covered by a path glob.
    #[must_use]
    pub fn covers_path(&self, file: &str) -> bool {
        self.paths.iter().any(|g| g.is_match(file))
    }
}

// ────────────────────────────────────────────
// Aggregate root
// ────────────────────────────────────────────

/// Validated architecture model.
///
/// All cross-references are verified at construction time.
#[derive(Debug, Clone, Default)]
pub struct ArchitectureModel {
    layers: Vec<Mapping>,
    containers: Vec<Mapping>,
    contexts: Vec<Mapping>,
    dependencies: BTreeMap<ElementName, Vec<ElementName>>,
}

impl ArchitectureModel {
    /// Creates a model with full validation.
    ///
    /// # Errors
    ///
    /// Returns every problem found: duplicate names within a kind, unknown
    /// layers in `dependencies` and layers listed as depending on
    /// themselves.
    pub fn new(
        layers: Vec<Mapping>,
        containers: Vec<Mapping>,
        contexts: Vec<Mapping>,
        dependencies: BTreeMap<ElementName, Vec<ElementName>>,
    ) -> Result<Self, Vec<ModelError>> {
        let mut errors = Vec::new();

        for (kind, mappings) in [
            (ElementKind::Layer, &layers),
            (ElementKind::Container, &containers),
            (ElementKind::Context, &contexts),
        ] {
            let mut seen = BTreeSet::new();
            for m in mappings {
                if !seen.insert(&m.name) {
                    errors.push(ModelError::Duplicate {
                        kind,
                        name: m.name.clone(),
                    });
                }
            }
        }

        let known: BTreeSet<&ElementName> = layers.iter().map(Mapping::name).collect();
        for (from, allowed) in &dependencies {
            if !known.contains(from) {
                errors.push(ModelError::UnknownLayer {
                    context: "dependencies".to_string(),
                    name: from.clone(),
                });
            }
            for to in allowed {
                if to == from {
                    errors.push(ModelError::SelfDependency { name: from.clone() });
                } else if !known.contains(to) {
                    errors.push(ModelError::UnknownLayer {
                        context: format!("dependencies.{from}"),
                        name: to.clone(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(Self {
                layers,
                containers,
                contexts,
                dependencies,
            })
        } else {
            Err(errors)
        }
    }

    /// Returns true if the model defines nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.containers.is_empty() && self.contexts.is_empty()
    }

    /// Returns the mappings of one kind, in declaration order.
    #[must_use]
    pub fn mappings(&self, kind: ElementKind) -> &[Mapping] {
        match kind {
            ElementKind::Layer => &self.layers,
            ElementKind::Container => &self.containers,
            ElementKind::Context => &self.contexts,
        }
    }

    /// Returns the allowed layer dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeMap<ElementName, Vec<ElementName>> {
        &self.dependencies
    }

    /// Finds the element of `kind` covering `node`.
    ///
    /// The longest matching package prefix wins; on equal length the
    /// earlier declaration wins. Nodes no prefix covers fall back to the
    /// first mapping whose path globs match the node's file.
    #[must_use]
    pub fn element_for(&self, kind: ElementKind, node: &IRNode) -> Option<&ElementName> {
        let mappings = self.mappings(kind);

        let mut best: Option<(usize, &Mapping)> = None;
        for m in mappings {
            if let Some(len) = m.package_match(&node.fqname) {
                if best.map_or(true, |(best_len, _)| len > best_len) {
                    best = Some((len, m));
                }
            }
        }
        if let Some((_, m)) = best {
            return Some(m.name());
        }

        let file = node.file()?;
        mappings.iter().find(|m| m.covers_path(file)).map(Mapping::name)
    }

    /// Compiles `[dependencies]` into `allow dependency` rules.
    ///
    /// For each listed layer `L` the rule
    /// `allow dependency within src.layer = "L" and dst.layer =~ ".+" when dst.layer in [L, allowed...]`
    /// is produced. Dependencies on code outside every layer are not
    /// constrained.
    #[must_use]
    pub fn layer_rules(&self) -> RulesDocumentAst {
        let rules = self
            .dependencies
            .iter()
            .map(|(from, allowed)| {
                let mut items = vec![LiteralAst::Str(from.to_string())];
                items.extend(allowed.iter().map(|l| LiteralAst::Str(l.to_string())));

                let within = ExprAst::and(
                    ExprAst::compare("src.layer", CompareOp::Eq, str_operand(from.as_str())),
                    ExprAst::compare("dst.layer", CompareOp::RegexMatch, str_operand(".+")),
                );
                let when = ExprAst::compare(
                    "dst.layer",
                    CompareOp::In,
                    OperandAst::List {
                        items,
                        span: Span::default(),
                    },
                );

                let allowed_text = if allowed.is_empty() {
                    "no other layer".to_string()
                } else {
                    allowed
                        .iter()
                        .map(ElementName::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                };

                let mut rule = RuleAst::new(
                    format!("model-layer-{from}"),
                    RuleAction::Allow,
                    WhenAst::new(RuleTarget::Dependency, when),
                );
                rule.name = Some(format!("{from} layer dependencies"));
                rule.within = Some(WhenAst::new(RuleTarget::Dependency, within));
                rule.message = Some(format!("layer `{from}` may only depend on {allowed_text}"));
                rule.description = Some("Generated from architecture model".to_string());
                rule.file = Some("<architecture model>".to_string());
                rule
            })
            .collect();
        RulesDocumentAst { rules }
    }
}

fn str_operand(s: &str) -> OperandAst {
    OperandAst::Literal {
        value: LiteralAst::Str(s.to_string()),
        span: Span::default(),
    }
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Errors in domain model construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Element name is empty.
    #[error("element name must not be empty")]
    EmptyName,

    /// Element name contains invalid characters.
    #[error("invalid element name `{name}`: must be [A-Za-z0-9_-]")]
    InvalidName {
        /// The invalid name.
        name: String,
    },

    /// Package prefix is empty.
    #[error("package prefix `{prefix}` is empty")]
    EmptyPackage {
        /// The prefix as written.
        prefix: String,
    },

    /// Path glob does not compile.
    #[error("invalid path glob `{pattern}`: {reason}")]
    InvalidGlob {
        /// The pattern.
        pattern: String,
        /// Why it failed.
        reason: String,
    },

    /// Two elements of one kind share a name.
    #[error("duplicate {kind} `{name}`")]
    Duplicate {
        /// Element kind.
        kind: ElementKind,
        /// Repeated name.
        name: ElementName,
    },

    /// Reference to a layer that is not defined.
    #[error("{context}: unknown layer `{name}`")]
    UnknownLayer {
        /// Where the reference occurs.
        context: String,
        /// The unknown name.
        name: ElementName,
    },

    /// A layer listed as a dependency of itself.
    #[error("layer `{name}` lists itself as a dependency")]
    SelfDependency {
        /// The layer.
        name: ElementName,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgate_core::ir::{Language, SourceLoc, SymbolKind};

    fn name(s: &str) -> ElementName {
        ElementName::new(s).unwrap()
    }

    fn mapping(n: &str, packages: &[&str], paths: &[&str]) -> Mapping {
        Mapping::new(
            name(n),
            packages.iter().map(|p| PackagePrefix::new(p).unwrap()).collect(),
            paths.iter().map(|p| GlobMatcher::new(p).unwrap()).collect(),
            None,
        )
    }

    #[test]
    fn element_names_are_validated() {
        assert!(ElementName::new("domain-core_2").is_ok());
        assert_eq!(ElementName::new(""), Err(ModelError::EmptyName));
        assert!(matches!(
            ElementName::new("has space"),
            Err(ModelError::InvalidName { .. })
        ));
    }

    #[test]
    fn prefixes_match_at_segment_boundaries() {
        let p = PackagePrefix::new("app.domain.").unwrap();
        assert_eq!(p.as_str(), "app.domain");
        assert_eq!(p.match_len("app.domain"), Some(10));
        assert_eq!(p.match_len("app.domain.Order"), Some(10));
        assert_eq!(p.match_len("app.domainx"), None);

        let rust = PackagePrefix::new("crate::infra").unwrap();
        assert!(rust.match_len("crate::infra::db").is_some());
        assert!(PackagePrefix::new("::").is_err());
    }

    #[test]
    fn longest_prefix_wins_then_paths() {
        let model = ArchitectureModel::new(
            vec![
                mapping("app", &["app"], &[]),
                mapping("domain", &["app.domain"], &[]),
                mapping("scripts", &[], &["scripts/**"]),
            ],
            vec![],
            vec![],
            BTreeMap::new(),
        )
        .unwrap();

        let order = IRNode::new(Language::Python, SymbolKind::Class, "app.domain.Order");
        let api = IRNode::new(Language::Python, SymbolKind::Module, "app.api");
        let tool = IRNode::new(Language::Python, SymbolKind::Module, "tool")
            .with_loc(SourceLoc::file("scripts/gen/tool.py"));
        let lost = IRNode::new(Language::Python, SymbolKind::Module, "other");

        assert_eq!(model.element_for(ElementKind::Layer, &order), Some(&name("domain")));
        assert_eq!(model.element_for(ElementKind::Layer, &api), Some(&name("app")));
        assert_eq!(model.element_for(ElementKind::Layer, &tool), Some(&name("scripts")));
        assert_eq!(model.element_for(ElementKind::Layer, &lost), None);
        assert_eq!(model.element_for(ElementKind::Container, &order), None);
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut deps = BTreeMap::new();
        deps.insert(name("domain"), vec![name("domain"), name("ghost")]);
        deps.insert(name("nowhere"), vec![]);
        let errors = ArchitectureModel::new(
            vec![mapping("domain", &["a"], &[]), mapping("domain", &["b"], &[])],
            vec![],
            vec![],
            deps,
        )
        .unwrap_err();

        assert!(errors.contains(&ModelError::Duplicate {
            kind: ElementKind::Layer,
            name: name("domain")
        }));
        assert!(errors.contains(&ModelError::SelfDependency { name: name("domain") }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelError::UnknownLayer { name, .. } if name.as_str() == "ghost")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelError::UnknownLayer { name, .. } if name.as_str() == "nowhere")));
    }

    #[test]
    fn dependencies_become_allow_rules() {
        let mut deps = BTreeMap::new();
        deps.insert(name("application"), vec![name("domain")]);
        let model = ArchitectureModel::new(
            vec![mapping("domain", &["app.domain"], &[]), mapping("application", &["app.app"], &[])],
            vec![],
            vec![],
            deps,
        )
        .unwrap();

        let doc = model.layer_rules();
        assert_eq!(doc.rules.len(), 1);
        let rule = &doc.rules[0];
        assert_eq!(rule.id, "model-layer-application");
        assert_eq!(rule.action, RuleAction::Allow);
        assert!(rule.within.is_some());
        assert_eq!(
            rule.message.as_deref(),
            Some("layer `application` may only depend on domain")
        );
    }
}
