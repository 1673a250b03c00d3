//! `vizpack entries` command implementation.

use super::{exit_with, load_pipeline, parse_mode, project_root};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use vizpack_core::{Config, DeploymentMode, EntryRole};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntriesJson {
    mode: DeploymentMode,
    active: Vec<EntryJson>,
    document_entries: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryJson {
    name: String,
    source: PathBuf,
    role: EntryRole,
}

/// Print the active set of `mode` without building anything.
pub fn run(config: &Config, mode: &str) -> Result<()> {
    let mode = parse_mode(mode);
    let pipeline = load_pipeline(&project_root(&config.cwd));
    let active = pipeline
        .resolve(mode)
        .unwrap_or_else(|e| exit_with(&[e.report()]));

    let result = EntriesJson {
        mode,
        active: active
            .entries()
            .iter()
            .map(|e| EntryJson {
                name: e.name.clone(),
                source: e.source_path.clone(),
                role: e.role,
            })
            .collect(),
        document_entries: active
            .document_entries()
            .into_iter()
            .map(|e| e.name.clone())
            .collect(),
    };

    if config.json_logs {
        let json = serde_json::to_string_pretty(&result).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    println!("mode: {}", result.mode);
    for entry in &result.active {
        let marker = if result.document_entries.contains(&entry.name) {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {:<24} {:<13} {}",
            entry.name,
            entry.role.as_str(),
            entry.source.display()
        );
    }
    println!("  (* loaded by the host document)");
    Ok(())
}
