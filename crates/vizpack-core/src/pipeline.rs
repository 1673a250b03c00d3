//! Build orchestration: resolve entries, bundle them, aggregate declarations
//! and write outputs.
//!
//! Order of a run:
//!
//! ```text
//! resolve -> bundle (parallel, joined) -> aggregate -> emit (parallel)
//!         -> prune stale -> host document -> declaration file
//! ```
//!
//! Any error before emission aborts the run with nothing written.

use crate::bundler::{BundlerService, CompiledArtifact, InProcessBundler};
use crate::config::{load_project_config, ProjectConfig};
use crate::declarations::aggregate;
use crate::document::{DocumentTemplater, HtmlTemplater};
use crate::emit::{script_url, OutputEmitter, WriteResult};
use crate::entry::{resolve_active_entries, ActiveSet, EntryPoint, EntryRegistry};
use crate::error::{BuildFailure, Error};
use crate::mode::DeploymentMode;
use crate::transform::Transformer;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Written output of one entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub name: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub result: WriteResult,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub mode: DeploymentMode,
    pub entries: Vec<EntryReport>,
    pub document: PathBuf,
    pub document_entries: Vec<String>,
    pub declarations: PathBuf,
    pub declared_types: Vec<String>,
    pub pruned: Vec<PathBuf>,
    pub duration_ms: u128,
}

pub struct Pipeline {
    root: PathBuf,
    config: ProjectConfig,
    registry: EntryRegistry,
    transformer: Transformer,
    bundler: Arc<dyn BundlerService>,
    templater: Arc<dyn DocumentTemplater>,
    emitter: OutputEmitter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("transformer", &self.transformer)
            .field("bundler", &self.bundler.name())
            .field("templater", &self.templater.name())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Load `vizpack.json` from `root` and build a pipeline from it.
    ///
    /// # Errors
    /// Returns a configuration error if the file is unreadable or invalid.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let config = load_project_config(&root)?;
        Self::from_config(root, config)
    }

    /// # Errors
    /// Returns a configuration error if the entry list is invalid.
    pub fn from_config(root: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self, Error> {
        let root = root.into();
        let registry = config.registry()?;
        let bundler = Arc::new(InProcessBundler::new(
            root.clone(),
            config.resolve.extensions.clone(),
        ));
        let templater = Arc::new(HtmlTemplater::new(root.join(&config.template)));
        let emitter = OutputEmitter::new(root.join(&config.output.dir));

        Ok(Self {
            root,
            config,
            registry,
            transformer: Transformer::default(),
            bundler,
            templater,
            emitter,
        })
    }

    #[must_use]
    pub fn with_bundler(mut self, bundler: Arc<dyn BundlerService>) -> Self {
        self.bundler = bundler;
        self
    }

    #[must_use]
    pub fn with_templater(mut self, templater: Arc<dyn DocumentTemplater>) -> Self {
        self.templater = templater;
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &EntryRegistry {
        &self.registry
    }

    #[must_use]
    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    #[must_use]
    pub fn emitter(&self) -> &OutputEmitter {
        &self.emitter
    }

    /// # Errors
    /// Returns a configuration error when the mode leaves no entries.
    pub fn resolve(&self, mode: DeploymentMode) -> Result<ActiveSet, Error> {
        resolve_active_entries(mode, self.registry.entries())
    }

    /// Bundle `entries`, in parallel when there are several. Results are in
    /// input order.
    #[must_use]
    pub fn compile(&self, entries: &[EntryPoint]) -> Vec<Result<CompiledArtifact, Vec<Error>>> {
        let bundle = |entry: &EntryPoint| self.bundler.bundle_entry(entry, &self.transformer);
        if entries.len() <= 1 {
            entries.iter().map(bundle).collect()
        } else {
            entries.par_iter().map(bundle).collect()
        }
    }

    /// Run a complete build for `mode`.
    ///
    /// # Errors
    /// Returns every error collected before the run was aborted.
    pub fn run(&self, mode: DeploymentMode) -> Result<BuildReport, BuildFailure> {
        let start = Instant::now();
        let active = self.resolve(mode)?;
        info!(mode = %mode, entries = ?active.names(), "build started");

        let mut artifacts = Vec::with_capacity(active.entries().len());
        let mut errors = Vec::new();
        for result in self.compile(active.entries()) {
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(entry_errors) => errors.extend(entry_errors),
            }
        }
        if !errors.is_empty() {
            return Err(BuildFailure { errors });
        }

        let mut report = self.finalize(&active, &artifacts)?;
        report.duration_ms = start.elapsed().as_millis();
        info!(mode = %mode, duration_ms = report.duration_ms, "build finished");
        Ok(report)
    }

    /// Aggregate declarations and write every output for `active`.
    ///
    /// `artifacts` must hold one artifact per active entry. Nothing is
    /// written when declarations conflict.
    ///
    /// # Errors
    /// Returns a declaration conflict, a missing artifact or I/O errors.
    pub fn finalize(
        &self,
        active: &ActiveSet,
        artifacts: &[CompiledArtifact],
    ) -> Result<BuildReport, BuildFailure> {
        let missing: Vec<Error> = active
            .entries()
            .iter()
            .filter(|e| !artifacts.iter().any(|a| a.entry_name == e.name))
            .map(|e| Error::configuration(format!("no compiled artifact for entry `{}`", e.name)))
            .collect();
        if !missing.is_empty() {
            return Err(BuildFailure { errors: missing });
        }

        let declarations = aggregate(&self.config.declarations.module_name, active, artifacts)?;

        let written: Vec<Result<EntryReport, Error>> = artifacts
            .par_iter()
            .filter(|a| active.contains(&a.entry_name))
            .map(|artifact| {
                let result = self.emitter.emit(&artifact.entry_name, artifact, active)?;
                Ok(EntryReport {
                    name: artifact.entry_name.clone(),
                    path: self.emitter.output_path(&artifact.entry_name),
                    bytes: artifact.output.len(),
                    result,
                })
            })
            .collect();
        let (entries, errors): (Vec<_>, Vec<_>) = written.into_iter().partition(Result::is_ok);
        let errors: Vec<Error> = errors.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            return Err(BuildFailure { errors });
        }
        let mut entries: Vec<EntryReport> = entries.into_iter().filter_map(Result::ok).collect();
        entries.sort_by_key(|r| {
            active
                .entries()
                .iter()
                .position(|e| e.name == r.name)
                .unwrap_or(usize::MAX)
        });

        let pruned = self.emitter.prune_stale(self.registry.entries(), active)?;

        let document_entries: Vec<String> = active
            .document_entries()
            .into_iter()
            .map(|e| e.name.clone())
            .collect();
        let urls: Vec<String> = document_entries
            .iter()
            .map(|name| script_url(&self.config.output.public_path, name))
            .collect();
        let html = self.templater.render(&urls)?;
        let document = self.emitter.out_dir().join("index.html");
        self.emitter.write_file(&document, html.as_bytes())?;

        let declarations_path = self.emitter.out_dir().join(&self.config.declarations.out);
        self.emitter
            .write_file(&declarations_path, declarations.render().as_bytes())?;

        Ok(BuildReport {
            mode: active.mode(),
            entries,
            document,
            document_entries,
            declarations: declarations_path,
            declared_types: declarations.types().iter().map(|t| t.name.clone()).collect(),
            pruned,
            duration_ms: 0,
        })
    }
}
