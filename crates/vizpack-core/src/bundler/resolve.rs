//! Import specifier resolution.
//!
//! Only relative specifiers (`./x`, `../x`) are followed. Everything else is
//! an external and stays an import of the emitted bundle.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Result of resolving an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Project module, as a root-relative key.
    Module(String),
    /// Left to the runtime.
    External(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot resolve '{specifier}' from {from}")]
pub struct ResolveError {
    pub specifier: String,
    pub from: String,
}

/// Resolves specifiers against the project root using the configured
/// extension list (tried in order, `""` meaning the path as written).
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    extensions: Vec<String>,
}

impl Resolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    /// Resolve `specifier` as written in the module `from` (a module key).
    pub fn resolve(&self, specifier: &str, from: &str) -> Result<Resolved, ResolveError> {
        if !(specifier.starts_with("./") || specifier.starts_with("../")) {
            return Ok(Resolved::External(specifier.to_string()));
        }

        let from_dir = Path::new(from).parent().unwrap_or(Path::new(""));
        let target = normalize(&from_dir.join(specifier));

        self.resolve_file_or_directory(&target)
            .map(|path| Resolved::Module(module_key(&path)))
            .ok_or_else(|| ResolveError {
                specifier: specifier.to_string(),
                from: from.to_string(),
            })
    }

    fn resolve_file_or_directory(&self, target: &Path) -> Option<PathBuf> {
        let with_extensions = |base: &Path| {
            self.extensions.iter().find_map(|ext| {
                let candidate = PathBuf::from(format!("{}{ext}", base.display()));
                self.root.join(&candidate).is_file().then_some(candidate)
            })
        };

        with_extensions(target).or_else(|| {
            self.root
                .join(target)
                .is_dir()
                .then(|| with_extensions(&target.join("index")))
                .flatten()
        })
    }
}

/// Stable key of a module path: `/`-separated, relative to the root.
#[must_use]
pub fn module_key(path: &Path) -> String {
    let mut key = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => key.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => key.push('/'),
            other => {
                if !key.is_empty() && !key.ends_with('/') {
                    key.push('/');
                }
                key.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    key
}

/// Lexically resolve `.` and `..` components.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
