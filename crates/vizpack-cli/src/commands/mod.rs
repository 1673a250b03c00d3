//! Subcommands.
//!
//! Fatal errors are written to stderr as one JSON object per failure
//! (`{"errorKind","entryNames","message"}`) and the process exits with 1.

pub mod build;
pub mod dev;
pub mod entries;
pub mod route;

use std::io::Write;
use std::path::{Path, PathBuf};
use vizpack_core::{DeploymentMode, Error, ErrorReport, Pipeline};

/// Print the structured error listing and exit with status 1.
pub fn exit_with(reports: &[ErrorReport]) -> ! {
    let mut stderr = std::io::stderr().lock();
    for report in reports {
        if let Ok(line) = serde_json::to_string(report) {
            let _ = writeln!(stderr, "{line}");
        }
    }
    let _ = stderr.flush();
    std::process::exit(1);
}

/// Parse a `--mode` value, exiting with a configuration error when malformed.
pub fn parse_mode(value: &str) -> DeploymentMode {
    value
        .parse()
        .unwrap_or_else(|e: Error| exit_with(&[e.report()]))
}

/// Canonical project root, so watcher paths and module keys line up.
pub fn project_root(cwd: &Path) -> PathBuf {
    cwd.canonicalize()
        .unwrap_or_else(|e| exit_with(&[Error::io(cwd, e).report()]))
}

/// Load the project at `root`, exiting on a configuration error.
pub fn load_pipeline(root: &Path) -> Pipeline {
    Pipeline::load(root).unwrap_or_else(|e| exit_with(&[e.report()]))
}
