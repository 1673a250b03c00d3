//! Bundler service.
//!
//! Turns one entry into one [`CompiledArtifact`]:
//!
//! 1. **Graph** - follow relative imports from the entry source
//! 2. **Transform** - route every module and run its chain (parallel per
//!    frontier)
//! 3. **Emit** - link modules into a single ES module

mod emit;
mod graph;
mod resolve;

pub use emit::{emit_bundle, import_specifiers};
pub use graph::{Module, ModuleGraph, ModuleId};
pub use resolve::{module_key, normalize, ResolveError, Resolved, Resolver};

use crate::entry::EntryPoint;
use crate::transform::{Transformer, TypeDeclaration};
use crate::Error;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use vizpack_util::fs::read_to_string_lossy;

/// Compiled output of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub entry_name: String,
    pub output: Vec<u8>,
    /// Exported types of every module in the entry, in discovery order.
    pub declared_types: Vec<TypeDeclaration>,
    /// Keys of the source files the entry was built from: its modules plus
    /// the stylesheets they pulled in with `@use`/`@import`.
    pub modules: Vec<String>,
}

impl CompiledArtifact {
    /// Whether `key` is part of this entry's module closure.
    #[must_use]
    pub fn contains_module(&self, key: &str) -> bool {
        self.modules.iter().any(|m| m == key)
    }
}

/// Builds one entry at a time. Called concurrently for distinct entries.
pub trait BundlerService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bundle `entry`. Every per-file failure is returned, not only the first.
    fn bundle_entry(
        &self,
        entry: &EntryPoint,
        transformer: &Transformer,
    ) -> Result<CompiledArtifact, Vec<Error>>;
}

/// Built-in bundler: relative imports only, externals left as imports.
#[derive(Debug, Clone)]
pub struct InProcessBundler {
    root: PathBuf,
    resolver: Resolver,
}

impl InProcessBundler {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let root = root.into();
        Self {
            resolver: Resolver::new(root.clone(), extensions),
            root,
        }
    }

    fn load(&self, entry: &str, key: &str, transformer: &Transformer) -> Result<Module, Error> {
        let path = self.root.join(key);
        let source = read_to_string_lossy(&path).map_err(|source| Error::ModuleRead {
            entry: entry.to_string(),
            path: PathBuf::from(key),
            source,
        })?;

        let output = transformer
            .transform_in(&self.root, Path::new(key), &source)
            .map_err(|e| e.into_error(entry))?;

        // Imports elided because they only carried types still join the
        // graph: their modules are registered but never required.
        let mut specifiers = import_specifiers(&output.code);
        for spec in &output.source_imports {
            if is_relative(spec) && !specifiers.contains(spec) {
                specifiers.push(spec.clone());
            }
        }

        let imports = specifiers
            .into_iter()
            .map(|spec| {
                let resolved =
                    self.resolver
                        .resolve(&spec, key)
                        .map_err(|e| Error::UnresolvedImport {
                            entry: entry.to_string(),
                            specifier: e.specifier,
                            from: e.from,
                        })?;
                Ok((spec, resolved))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let loaded_files = output
            .loaded_files
            .iter()
            .filter_map(|path| path.strip_prefix(&self.root).ok())
            .map(|rel| module_key(&normalize(rel)))
            .collect();

        Ok(Module {
            key: key.to_string(),
            code: output.code,
            declarations: output.declarations,
            imports,
            loaded_files,
            dependencies: Vec::new(),
        })
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

impl BundlerService for InProcessBundler {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn bundle_entry(
        &self,
        entry: &EntryPoint,
        transformer: &Transformer,
    ) -> Result<CompiledArtifact, Vec<Error>> {
        let entry_key = module_key(&normalize(&entry.source_path));
        let mut graph = ModuleGraph::new();
        let mut seen: HashSet<String> = HashSet::from([entry_key.clone()]);
        let mut frontier = vec![entry_key];
        let mut errors = Vec::new();

        while !frontier.is_empty() {
            let loaded: Vec<Result<Module, Error>> = frontier
                .par_iter()
                .map(|key| self.load(&entry.name, key, transformer))
                .collect();

            let mut next = Vec::new();
            for result in loaded {
                match result {
                    Ok(module) => {
                        for (_, resolved) in &module.imports {
                            if let Resolved::Module(key) = resolved {
                                if seen.insert(key.clone()) {
                                    next.push(key.clone());
                                }
                            }
                        }
                        graph.add(module);
                    }
                    Err(error) => errors.push(error),
                }
            }
            frontier = next;
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        graph.link();
        let order = graph.toposort();
        let code = emit_bundle(&graph, &order, 0);

        let mut declared_types: Vec<TypeDeclaration> = Vec::new();
        for (_, module) in graph.iter() {
            for declaration in &module.declarations {
                if !declared_types.contains(declaration) {
                    declared_types.push(declaration.clone());
                }
            }
        }

        debug!(
            entry = %entry.name,
            modules = graph.len(),
            bytes = code.len(),
            "bundled entry"
        );

        let mut modules: Vec<String> = graph.iter().map(|(_, m)| m.key.clone()).collect();
        for (_, module) in graph.iter() {
            for key in &module.loaded_files {
                if !modules.contains(key) {
                    modules.push(key.clone());
                }
            }
        }

        Ok(CompiledArtifact {
            entry_name: entry.name.clone(),
            output: code.into_bytes(),
            declared_types,
            modules,
        })
    }
}
