//! `vizpack route` command implementation.

use super::{exit_with, load_pipeline, project_root};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vizpack_core::transform::{StyleStep, STYLE_STEPS};
use vizpack_core::{codes, Config, ErrorReport, Stage};

#[derive(Serialize)]
struct RouteJson {
    path: PathBuf,
    stages: Vec<&'static str>,
    /// Expanded steps, with the style stage split into its sub-steps.
    steps: Vec<&'static str>,
}

/// Print the chain `file` is routed to under the project's rule table.
pub fn run(config: &Config, file: &Path) -> Result<()> {
    let pipeline = load_pipeline(&project_root(&config.cwd));
    let chain = pipeline
        .transformer()
        .rules()
        .route_for(file)
        .unwrap_or_else(|e| {
            exit_with(&[ErrorReport {
                error_kind: codes::UNROUTABLE_ASSET,
                entry_names: Vec::new(),
                message: e.to_string(),
            }])
        });

    let result = RouteJson {
        path: file.to_path_buf(),
        stages: chain.iter().map(Stage::as_str).collect(),
        steps: chain
            .iter()
            .flat_map(|stage| match stage {
                Stage::Style => STYLE_STEPS.iter().map(StyleStep::as_str).collect::<Vec<_>>(),
                other => vec![other.as_str()],
            })
            .collect(),
    };

    if config.json_logs {
        let json = serde_json::to_string_pretty(&result).into_diagnostic()?;
        println!("{json}");
    } else {
        println!("{}: {}", result.path.display(), result.steps.join(" -> "));
    }
    Ok(())
}
