//! End-to-end pipeline: fragments in, report out.

use std::path::PathBuf;

use archgate_core::ir::{build_index, ArchitectureIR, IrMerger};
use archgate_core::rules::{compile, RuleEvaluator, RuleSet, RulesDocumentAst};
use archgate_core::snapshot::{
    Snapshot, SnapshotBuilder, SnapshotDiff, SnapshotDiffEngine, SnapshotRef, SnapshotStore,
};
use archgate_core::{ArchError, DiffSummary, Report, RunInfo, Violation};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::fragments::{FragmentError, FragmentLoader};
use crate::loader::{self, LoadError};
use crate::model::{ArchitectureModel, LoadModelError, ModelResolver};
use crate::store::{FsSnapshotStore, StoreError};

/// Label used for the unsaved graph of the current run in diffs.
pub const CURRENT_LABEL: &str = "current";

/// Errors that abort an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fragment discovery or decoding failed.
    #[error(transparent)]
    Fragments(#[from] FragmentError),

    /// Rule loading failed.
    #[error(transparent)]
    Rules(#[from] LoadError),

    /// The architecture model is invalid.
    #[error(transparent)]
    Model(#[from] LoadModelError),

    /// Snapshot storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A core stage failed (merge conflict, index contract, rule compile).
    #[error(transparent)]
    Core(#[from] ArchError),
}

impl EngineError {
    /// The core error behind this one, if any.
    #[must_use]
    pub fn arch_error(&self) -> Option<&ArchError> {
        match self {
            Self::Core(e) | Self::Rules(LoadError::Rules(e)) => Some(e),
            _ => None,
        }
    }
}

/// Output of [`Engine::evaluate`].
#[derive(Debug, Clone)]
pub struct Checked {
    /// The graph the rules ran against.
    pub ir: ArchitectureIR,
    /// The rules that ran.
    pub rules: RuleSet,
    /// Violations found.
    pub violations: Vec<Violation>,
    /// Rules that had to be abandoned.
    pub errors: Vec<ArchError>,
}

/// Runs checks, snapshots and diffs for one project.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    store: FsSnapshotStore,
}

impl Engine {
    /// Creates an engine storing snapshots under the project root.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let store = FsSnapshotStore::new(&config.root);
        Self { config, store }
    }

    /// Replaces the snapshot store.
    #[must_use]
    pub fn with_store(mut self, store: FsSnapshotStore) -> Self {
        self.store = store;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the snapshot store.
    #[must_use]
    pub fn store(&self) -> &FsSnapshotStore {
        &self.store
    }

    /// Loads the architecture model, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file is unreadable or invalid.
    pub fn load_model(&self) -> Result<Option<ArchitectureModel>, EngineError> {
        let Some(path) = &self.config.model else {
            return Ok(None);
        };
        let model = ArchitectureModel::from_file(path)?;
        debug!(path = %path.display(), "loaded architecture model");
        Ok(Some(model))
    }

    /// Loads fragments, merges and normalizes them, and resolves the model.
    ///
    /// # Errors
    ///
    /// Returns fragment errors, model errors or a merge conflict.
    pub fn build_ir(&self) -> Result<ArchitectureIR, EngineError> {
        let model = self.load_model()?;
        self.build_ir_with(model.as_ref())
    }

    fn build_ir_with(&self, model: Option<&ArchitectureModel>) -> Result<ArchitectureIR, EngineError> {
        let fragments = FragmentLoader::new(&self.config.root).load(&self.config.fragments)?;
        let mut ir = IrMerger::new()
            .normalize_options(self.config.normalize)
            .merge(fragments)?;
        if let Some(model) = model {
            ModelResolver::new(model).resolve(&mut ir);
        }
        info!(nodes = ir.nodes.len(), edges = ir.edges.len(), "built architecture graph");
        Ok(ir)
    }

    /// Loads the configured rule files plus the model's layer rules and
    /// compiles them as one document.
    ///
    /// # Errors
    ///
    /// Returns IO, parse, compile or model errors.
    pub fn load_rules(&self) -> Result<RuleSet, EngineError> {
        let model = self.load_model()?;
        self.load_rules_with(model.as_ref())
    }

    fn load_rules_with(&self, model: Option<&ArchitectureModel>) -> Result<RuleSet, EngineError> {
        let mut doc = if self.config.rules.is_empty() {
            RulesDocumentAst::default()
        } else {
            loader::load_documents(&self.config.rules)?
        };
        if let Some(model) = model {
            let mut generated = model.layer_rules();
            if let Some(path) = &self.config.model {
                for rule in &mut generated.rules {
                    rule.file = Some(path.display().to_string());
                }
            }
            doc.extend(generated);
        }
        let rules = compile(&doc)?;
        debug!(rules = rules.len(), "compiled rules");
        Ok(rules)
    }

    /// Builds the graph and evaluates the rules against it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Engine::build_ir`] or [`Engine::load_rules`],
    /// or an index contract violation.
    pub fn evaluate(&self) -> Result<Checked, EngineError> {
        let model = self.load_model()?;
        let rules = self.load_rules_with(model.as_ref())?;
        let ir = self.build_ir_with(model.as_ref())?;

        let evaluation = {
            let index = build_index(&ir)?;
            RuleEvaluator::new().evaluate(&rules, &index)
        };
        info!(
            violations = evaluation.violations.len(),
            errors = evaluation.errors.len(),
            "evaluated rules"
        );

        Ok(Checked {
            ir,
            rules,
            violations: evaluation.violations,
            errors: evaluation.errors,
        })
    }

    /// Runs a full check.
    ///
    /// When a baseline is configured and present, violations are classified
    /// against it and the graph delta is summarized. A configured but
    /// missing baseline is logged and every violation is reported with
    /// unknown status. With `save_ref` set, the checked graph and its
    /// violations are saved.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Engine::evaluate`], or a store error.
    pub fn check(&self) -> Result<Report, EngineError> {
        let started_at = Utc::now();
        let checked = self.evaluate()?;

        let baseline = match &self.config.baseline {
            Some(reference) if self.store.exists(reference) => {
                Some((reference, self.store.load(reference)?))
            }
            Some(reference) => {
                warn!(
                    baseline = %reference,
                    "baseline snapshot not found; reporting all violations as unknown"
                );
                None
            }
            None => None,
        };

        let run = RunInfo {
            repo_root: Some(self.config.root.display().to_string()),
            tool_version: Some(self.tool_version()),
            started_at: Some(started_at),
            baseline: baseline.as_ref().map(|(r, _)| r.to_string()),
            rules: checked.rules.len(),
            nodes: checked.ir.nodes.len(),
            edges: checked.ir.edges.len(),
            fingerprint: Some(checked.ir.fingerprint()),
        };

        let mut builder = Report::builder(run)
            .violations(checked.violations.clone())
            .errors(checked.errors);
        if let Some((reference, snapshot)) = &baseline {
            let diff = SnapshotDiffEngine::new().diff_ir(&snapshot.ir(), &checked.ir, false);
            builder = builder
                .baseline(snapshot.violations().to_vec())
                .diff(DiffSummary::new(reference.as_str(), CURRENT_LABEL, &diff));
        }
        let report = builder.build();

        if let Some(reference) = &self.config.save_ref {
            let snapshot = self.snapshot_of(checked.ir, Some(checked.violations));
            let path = self.store.save(&snapshot, reference)?;
            info!(path = %path.display(), "saved snapshot");
        }

        Ok(report)
    }

    /// Saves the current graph and its violations as a baseline.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Engine::evaluate`], or a store error.
    pub fn create_baseline(&self, reference: &SnapshotRef) -> Result<PathBuf, EngineError> {
        let checked = self.evaluate()?;
        let count = checked.violations.len();
        let snapshot = self.snapshot_of(checked.ir, Some(checked.violations));
        let path = self.store.save(&snapshot, reference)?;
        info!(violations = count, path = %path.display(), "created baseline");
        Ok(path)
    }

    /// Saves the current graph without violations.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Engine::build_ir`], or a store error.
    pub fn save_snapshot(&self, reference: &SnapshotRef) -> Result<PathBuf, EngineError> {
        let ir = self.build_ir()?;
        let snapshot = self.snapshot_of(ir, None);
        Ok(self.store.save(&snapshot, reference)?)
    }

    /// Diffs two stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns a store error if either snapshot cannot be loaded.
    pub fn diff(
        &self,
        from: &SnapshotRef,
        to: &SnapshotRef,
        include_details: bool,
    ) -> Result<SnapshotDiff, EngineError> {
        let before = self.store.load(from)?;
        let after = self.store.load(to)?;
        Ok(SnapshotDiffEngine::new().diff(&before, &after, include_details))
    }

    fn snapshot_of(&self, ir: ArchitectureIR, violations: Option<Vec<Violation>>) -> Snapshot {
        let mut builder = SnapshotBuilder::new()
            .repo_root(self.config.root.display().to_string())
            .tool_version(self.tool_version())
            .captured_at(Utc::now());
        if let Some(violations) = violations {
            builder = builder.violations(violations);
        }
        builder.build(ir)
    }

    fn tool_version(&self) -> String {
        self.config
            .tool_version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }
}
