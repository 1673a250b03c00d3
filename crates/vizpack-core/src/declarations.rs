//! Declaration aggregation.
//!
//! Every active entry's exported types are merged, in configuration order,
//! into one namespaced declaration file. A name declared twice with the same
//! text is kept once; with different text it is a conflict.

use crate::bundler::CompiledArtifact;
use crate::entry::ActiveSet;
use crate::transform::TypeDeclaration;
use crate::Error;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

/// Result of merging one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// Same name, same text; dropped.
    Duplicate,
    /// Same name, different text. Nothing was changed.
    Conflict { existing_entry: String },
}

/// A merged type and the entry that first declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedType {
    pub name: String,
    pub definition: String,
    pub entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedDeclaration {
    module_name: String,
    types: Vec<MergedType>,
    index: HashMap<String, usize>,
}

impl AggregatedDeclaration {
    #[must_use]
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            types: Vec::new(),
            index: HashMap::new(),
        }
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Merged types in insertion order.
    #[must_use]
    pub fn types(&self) -> &[MergedType] {
        &self.types
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&i| self.types[i].definition.as_str())
    }

    pub fn insert(&mut self, entry: &str, declaration: &TypeDeclaration) -> MergeOutcome {
        if let Some(&i) = self.index.get(&declaration.name) {
            let existing = &self.types[i];
            return if existing.definition == declaration.definition {
                MergeOutcome::Duplicate
            } else {
                MergeOutcome::Conflict {
                    existing_entry: existing.entry.clone(),
                }
            };
        }

        self.index.insert(declaration.name.clone(), self.types.len());
        self.types.push(MergedType {
            name: declaration.name.clone(),
            definition: declaration.definition.clone(),
            entry: entry.to_string(),
        });
        MergeOutcome::Inserted
    }

    /// Render as one `declare module` block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("declare module '{}' {{\n", self.module_name);
        for merged in &self.types {
            for (i, line) in merged.definition.lines().enumerate() {
                if i == 0 {
                    let _ = writeln!(out, "  export {line}");
                } else if line.is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "  {line}");
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Merge the declarations of every active entry.
///
/// Artifacts of entries outside `active` are ignored.
///
/// # Errors
/// Returns [`Error::DeclarationConflict`] naming both entries when a type is
/// declared with different text.
pub fn aggregate(
    module_name: &str,
    active: &ActiveSet,
    artifacts: &[CompiledArtifact],
) -> Result<AggregatedDeclaration, Error> {
    let mut aggregated = AggregatedDeclaration::new(module_name);

    for entry in active.entries() {
        let Some(artifact) = artifacts.iter().find(|a| a.entry_name == entry.name) else {
            continue;
        };
        for declaration in &artifact.declared_types {
            let outcome = aggregated.insert(&entry.name, declaration);
            debug!(entry = %entry.name, name = %declaration.name, ?outcome, "merge declaration");
            if let MergeOutcome::Conflict { existing_entry } = outcome {
                return Err(Error::DeclarationConflict {
                    type_name: declaration.name.clone(),
                    first_entry: existing_entry,
                    second_entry: entry.name.clone(),
                });
            }
        }
    }

    Ok(aggregated)
}
