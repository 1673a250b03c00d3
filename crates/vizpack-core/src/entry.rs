//! Entry points and the Entry Set Resolver.
//!
//! Which entries are compiled for a deployment mode is a pure function of the
//! mode and the registry; nothing here touches the filesystem.

use crate::error::Error;
use crate::mode::DeploymentMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// The deployment shape an entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// Standalone web application.
    Live,
    /// Widget embedded by production hosts.
    Embedded,
    /// Embedded widget with development conveniences.
    EmbeddedDev,
    /// Reusable component package with a published type surface.
    Library,
}

impl EntryRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Embedded => "embedded",
            Self::EmbeddedDev => "embedded_dev",
            Self::Library => "library",
        }
    }
}

/// A named root module that becomes one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub source_path: PathBuf,
    pub role: EntryRole,
}

impl EntryPoint {
    #[must_use]
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>, role: EntryRole) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            role,
        }
    }
}

/// Entries in configuration declaration order, with unique names.
#[derive(Debug, Clone)]
pub struct EntryRegistry {
    entries: Vec<EntryPoint>,
}

impl EntryRegistry {
    /// Build a registry, rejecting empty or duplicate names.
    pub fn new(entries: Vec<EntryPoint>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(Error::configuration("entry with an empty name"));
            }
            if entry.name.contains(['/', '\\']) {
                return Err(Error::configuration(format!(
                    "entry name `{}` must not contain path separators",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::configuration(format!(
                    "entry `{}` is declared more than once",
                    entry.name
                )));
            }
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntryPoint> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// The entries compiled for one mode, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSet {
    mode: DeploymentMode,
    entries: Vec<EntryPoint>,
}

impl ActiveSet {
    #[must_use]
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    #[must_use]
    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Active entries the host document loads, in registry order.
    #[must_use]
    pub fn document_entries(&self) -> Vec<&EntryPoint> {
        let excluded = document_exclusions(self.mode);
        self.entries
            .iter()
            .filter(|e| !excluded.contains(&e.role))
            .collect()
    }
}

/// Roles that are never compiled under `mode`.
///
/// EmbeddedDev and Live are mutually exclusive in every mode.
#[must_use]
pub fn excluded_roles(mode: DeploymentMode) -> &'static [EntryRole] {
    match mode {
        DeploymentMode::Production => &[EntryRole::EmbeddedDev],
        DeploymentMode::DevServerEmbedded => &[EntryRole::Live],
        DeploymentMode::DevServerLive => &[EntryRole::Embedded, EntryRole::EmbeddedDev],
    }
}

/// Roles the host document must not reference under `mode`.
///
/// Libraries are consumed as packages, never loaded by the page. In the
/// embedded dev server the EmbeddedDev harness loads the widget itself.
#[must_use]
pub fn document_exclusions(mode: DeploymentMode) -> Vec<EntryRole> {
    let mut roles = vec![EntryRole::Library];
    roles.extend_from_slice(excluded_roles(mode));
    if mode == DeploymentMode::DevServerEmbedded {
        roles.push(EntryRole::Embedded);
    }
    roles
}

/// Compute the entries compiled for `mode`.
///
/// # Errors
/// Returns a configuration error when no entry survives the exclusions.
pub fn resolve_active_entries(
    mode: DeploymentMode,
    entries: &[EntryPoint],
) -> Result<ActiveSet, Error> {
    let excluded = excluded_roles(mode);
    let active: Vec<EntryPoint> = entries
        .iter()
        .filter(|e| !excluded.contains(&e.role))
        .cloned()
        .collect();

    if active.is_empty() {
        return Err(Error::configuration(format!(
            "mode `{mode}` leaves no active entries"
        )));
    }

    Ok(ActiveSet {
        mode,
        entries: active,
    })
}
