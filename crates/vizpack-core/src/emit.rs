//! Output emission.
//!
//! One `<entry>.js` per active entry in the output directory. Writes go
//! through a temp file and a rename, are skipped when the bytes on disk are
//! already identical, and are serialized per path.
//!
//! The names of the entries written by the last build are kept in
//! [`MANIFEST_FILE`], so outputs of entries that were since removed from the
//! project file are pruned too.

use crate::bundler::CompiledArtifact;
use crate::entry::{ActiveSet, EntryPoint};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use vizpack_util::fs::{remove_if_exists, write_if_changed};

/// Output-directory file listing the entries of the last build.
pub const MANIFEST_FILE: &str = ".vizpack-manifest.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct OutputManifest {
    entries: BTreeSet<String>,
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    Written,
    /// The file already held these bytes.
    Unchanged,
    /// The entry is not active; nothing was written.
    Skipped,
}

impl WriteResult {
    #[must_use]
    pub fn unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

#[derive(Debug)]
pub struct OutputEmitter {
    out_dir: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl OutputEmitter {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    #[must_use]
    pub fn output_path(&self, entry_name: &str) -> PathBuf {
        self.out_dir.join(format!("{entry_name}.js"))
    }

    /// Write the artifact of `entry_name`, unless the entry is inactive.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub fn emit(
        &self,
        entry_name: &str,
        artifact: &CompiledArtifact,
        active: &ActiveSet,
    ) -> Result<WriteResult, Error> {
        if !active.contains(entry_name) {
            warn!(entry = entry_name, mode = %active.mode(), "refusing to emit inactive entry");
            return Ok(WriteResult::Skipped);
        }
        self.write_file(&self.output_path(entry_name), &artifact.output)
    }

    /// Write `bytes` to `path` under that path's lock.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<WriteResult, Error> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let written = write_if_changed(path, bytes).map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), written, "write output");
        Ok(if written {
            WriteResult::Written
        } else {
            WriteResult::Unchanged
        })
    }

    /// Remove the outputs of inactive entries, then record the active set in
    /// the manifest.
    ///
    /// Inactive means: in `registry` but not active, or listed in the
    /// manifest of an earlier build but not active. Returns the paths that
    /// were removed.
    ///
    /// # Errors
    /// Returns an I/O error if an existing output cannot be removed or the
    /// manifest cannot be written.
    pub fn prune_stale(
        &self,
        registry: &[EntryPoint],
        active: &ActiveSet,
    ) -> Result<Vec<PathBuf>, Error> {
        let mut stale: BTreeSet<String> = self.read_manifest().entries;
        stale.extend(registry.iter().map(|e| e.name.clone()));
        stale.retain(|name| !active.contains(name));

        let mut removed = Vec::new();
        for name in &stale {
            let path = self.output_path(name);
            let lock = self.path_lock(&path);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

            if remove_if_exists(&path).map_err(|e| Error::io(&path, e))? {
                info!(entry = %name, path = %path.display(), "removed stale output");
                removed.push(path);
            }
        }

        let manifest = OutputManifest {
            entries: active.entries().iter().map(|e| e.name.clone()).collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::io(self.manifest_path(), std::io::Error::other(e)))?;
        self.write_file(&self.manifest_path(), &json)?;
        Ok(removed)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    /// Entries of the last build; empty when the manifest is missing or
    /// unreadable. Names that are not plain file stems are ignored.
    fn read_manifest(&self) -> OutputManifest {
        let path = self.manifest_path();
        let Ok(bytes) = std::fs::read(&path) else {
            return OutputManifest::default();
        };
        match serde_json::from_slice::<OutputManifest>(&bytes) {
            Ok(mut manifest) => {
                manifest.entries.retain(|name| is_plain_name(name));
                manifest
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable output manifest");
                OutputManifest::default()
            }
        }
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != ".." && !name.contains(['/', '\\'])
}

/// URL of an entry's script under `public_path`.
#[must_use]
pub fn script_url(public_path: &str, entry_name: &str) -> String {
    if public_path.ends_with('/') {
        format!("{public_path}{entry_name}.js")
    } else {
        format!("{public_path}/{entry_name}.js")
    }
}
