//! Assigns layers, containers and contexts to IR nodes.

use archgate_core::ir::{ArchitectureIR, IRNode};
use tracing::debug;

use super::types::{ArchitectureModel, ElementKind};

/// How many node fields a resolution pass filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Layers assigned.
    pub layers: usize,
    /// Containers assigned.
    pub containers: usize,
    /// Contexts assigned.
    pub contexts: usize,
}

/// Fills in missing architecture fields from a model.
///
/// Values an extractor already set are kept.
#[derive(Debug, Clone, Copy)]
pub struct ModelResolver<'m> {
    model: &'m ArchitectureModel,
}

impl<'m> ModelResolver<'m> {
    /// Creates a resolver over `model`.
    #[must_use]
    pub fn new(model: &'m ArchitectureModel) -> Self {
        Self { model }
    }

    /// Resolves every node of `ir` in place.
    pub fn resolve(&self, ir: &mut ArchitectureIR) -> Resolution {
        let mut stats = Resolution::default();
        for node in &mut ir.nodes {
            if self.fill(node, ElementKind::Layer) {
                stats.layers += 1;
            }
            if self.fill(node, ElementKind::Container) {
                stats.containers += 1;
            }
            if self.fill(node, ElementKind::Context) {
                stats.contexts += 1;
            }
        }
        debug!(
            layers = stats.layers,
            containers = stats.containers,
            contexts = stats.contexts,
            "resolved architecture model"
        );
        stats
    }

    fn fill(&self, node: &mut IRNode, kind: ElementKind) -> bool {
        let present = match kind {
            ElementKind::Layer => node.layer.is_some(),
            ElementKind::Container => node.container.is_some(),
            ElementKind::Context => node.context.is_some(),
        };
        if present {
            return false;
        }
        let Some(name) = self.model.element_for(kind, node) else {
            return false;
        };
        let value = Some(name.to_string());
        match kind {
            ElementKind::Layer => node.layer = value,
            ElementKind::Container => node.container = value,
            ElementKind::Context => node.context = value,
        }
        true
    }
}
