//! File watching for dev sessions.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Quiet period that closes a batch of changes.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "target"];

/// Whether a change under `path` can never affect a build.
///
/// Outputs in `out_dir` are ignored so writing them does not retrigger a
/// rebuild.
#[must_use]
pub fn should_ignore(path: &Path, out_dir: &Path) -> bool {
    if path.starts_with(out_dir) {
        return true;
    }
    if path
        .components()
        .any(|c| IGNORED_DIRS.iter().any(|d| c.as_os_str() == *d))
    {
        return true;
    }
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Watch `root` recursively and send debounced batches of changed paths.
///
/// Blocks until the receiving side of `tx` is dropped. Run it on a blocking
/// thread.
///
/// # Errors
/// Returns an error if the watcher cannot be created or attached.
pub fn watch_project(
    root: &Path,
    out_dir: &Path,
    tx: mpsc::Sender<Vec<PathBuf>>,
) -> notify::Result<()> {
    let (event_tx, event_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(event_tx, Config::default())?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    debug!(root = %root.display(), "watching");

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        match event_rx.recv_timeout(DEBOUNCE) {
            Ok(Ok(event)) => {
                pending.extend(
                    event
                        .paths
                        .into_iter()
                        .filter(|p| !should_ignore(p, out_dir)),
                );
            }
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(RecvTimeoutError::Timeout) => {
                if pending.is_empty() {
                    continue;
                }
                let batch: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                if tx.blocking_send(batch).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
