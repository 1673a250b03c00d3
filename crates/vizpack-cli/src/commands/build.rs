//! `vizpack build` command implementation.

use super::{exit_with, load_pipeline, parse_mode, project_root};
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};
use vizpack_core::{BuildReport, Config, WriteResult};

/// Run a one-shot build.
///
/// With `--json` the [`BuildReport`] is printed to stdout as one object.
pub fn run(config: &Config, mode: &str) -> Result<()> {
    let mode = parse_mode(mode);
    let pipeline = load_pipeline(&project_root(&config.cwd));

    match pipeline.run(mode) {
        Ok(report) if config.json_logs => {
            let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            println!("{json}");
            Ok(())
        }
        Ok(report) => print_human(&report),
        Err(failure) => exit_with(&failure.reports()),
    }
}

fn print_human(report: &BuildReport) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "vizpack build ({})", report.mode).into_diagnostic()?;
    for entry in &report.entries {
        let status = match entry.result {
            WriteResult::Written => "written",
            WriteResult::Unchanged => "unchanged",
            WriteResult::Skipped => "skipped",
        };
        writeln!(
            out,
            "  {:<28} {:>9} B  {status}",
            format!("{}.js", entry.name),
            entry.bytes
        )
        .into_diagnostic()?;
    }
    for path in &report.pruned {
        writeln!(out, "  removed {}", path.display()).into_diagnostic()?;
    }
    writeln!(
        out,
        "  document: {} ({})",
        report.document.display(),
        report.document_entries.join(", ")
    )
    .into_diagnostic()?;
    writeln!(
        out,
        "  declarations: {} ({} types)",
        report.declarations.display(),
        report.declared_types.len()
    )
    .into_diagnostic()?;
    writeln!(out, "done in {}ms", report.duration_ms).into_diagnostic()?;
    Ok(())
}
