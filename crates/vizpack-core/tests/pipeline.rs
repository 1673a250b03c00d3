//! End-to-end pipeline runs against a small visualizer project.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vizpack_core::{
    DeploymentMode, Error, Pipeline, ProjectConfig, WriteResult, CONFIG_FILE,
};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Four entries sharing a types module, a stylesheet with a partial and a
/// text asset.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/types.ts",
        "export interface Skeleton {\n  name: string;\n  joints: number;\n}\n",
    );
    write(
        root,
        "src/live.ts",
        "import type { Skeleton } from './types';\nimport './styles/viewer.scss';\nimport help from './help.txt';\nexport interface LiveOptions {\n  url: string;\n}\nexport function connect(opts: LiveOptions): Promise<Skeleton> {\n  const label: string = help as string;\n  return fetch(opts.url + label).then((r) => r.json() as Promise<Skeleton>);\n}\n",
    );
    write(
        root,
        "src/embedded.ts",
        "import './styles/viewer.scss';\nexport interface Skeleton {\n  name: string;\n  joints: number;\n}\nexport const embed = (): number => 1;\n",
    );
    write(
        root,
        "src/embedded_dev.ts",
        "import { embed } from './embedded';\nembed();\n",
    );
    write(
        root,
        "src/NimbleStandaloneReact.ts",
        "import React from 'react';\nexport type ViewerProps = { recording: string };\nexport const version: string = '1.0.0';\nexport default function Viewer(props: ViewerProps) {\n  return React.createElement('div', null, props.recording);\n}\n",
    );
    write(
        root,
        "src/styles/viewer.scss",
        "@use 'theme';\n.viewer {\n  canvas { outline: 1px solid theme.$accent; }\n}\n",
    );
    write(root, "src/styles/_theme.scss", "$accent: #3366ff;\n");
    write(root, "src/help.txt", "Drag to orbit.\n");
    write(
        root,
        "src/index.html",
        "<!DOCTYPE html>\n<html>\n<head><title>Nimble</title></head>\n<body>\n<div id=\"root\"></div>\n</body>\n</html>\n",
    );
    dir
}

fn pipeline(dir: &TempDir) -> Pipeline {
    Pipeline::load(dir.path()).unwrap()
}

#[test]
fn test_production_build() {
    let dir = fixture();
    let report = pipeline(&dir).run(DeploymentMode::Production).unwrap();

    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["live", "embedded", "NimbleStandaloneReact"]);
    assert_eq!(report.document_entries, vec!["live", "embedded"]);

    let dist = dir.path().join("dist");
    assert!(dist.join("live.js").exists());
    assert!(dist.join("embedded.js").exists());
    assert!(dist.join("NimbleStandaloneReact.js").exists());
    assert!(!dist.join("embedded_dev.js").exists());

    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(html.contains(r#"<script type="module" src="/live.js"></script>"#));
    assert!(html.contains(r#"<script type="module" src="/embedded.js"></script>"#));
    assert!(!html.contains("NimbleStandaloneReact.js"));
    assert!(html.contains("<div id=\"root\"></div>"));

    let live = fs::read_to_string(dist.join("live.js")).unwrap();
    assert!(live.contains("Drag to orbit.\\n"));
    assert!(live.contains(".viewer canvas"));
    assert!(live.contains("#36f") || live.contains("#3366ff"));
    assert!(!live.contains("interface"));
    assert!(!live.contains(": string"));
    assert!(!live.contains("opts: LiveOptions"));
    assert!(!live.contains("Promise<Skeleton>"));
    assert!(!live.contains("help as string"));

    let lib = fs::read_to_string(dist.join("NimbleStandaloneReact.js")).unwrap();
    assert!(lib.starts_with("import * as __vizpack_ext_0 from \"react\";"));
}

#[test]
fn test_declarations_are_merged_and_stable() {
    let dir = fixture();
    let pipeline = pipeline(&dir);

    let first = pipeline.run(DeploymentMode::Production).unwrap();
    let text = fs::read_to_string(dir.path().join("dist/index.d.ts")).unwrap();
    assert!(text.starts_with("declare module 'nimble-visualizer' {\n"));
    assert_eq!(text.matches("export interface Skeleton").count(), 1);
    assert!(text.contains("export interface LiveOptions"));
    assert!(text.contains("export type ViewerProps = {"));
    assert!(text.contains("recording: string;"));
    assert!(text.contains("export function connect(opts: LiveOptions): Promise<Skeleton>;"));
    assert!(text.contains("export function Viewer(props: ViewerProps)"));
    assert!(text.contains("export const version: string;"));
    assert!(!text.contains("createElement"));
    assert_eq!(
        first.declared_types,
        vec!["LiveOptions", "connect", "Skeleton", "embed", "ViewerProps", "version", "Viewer"]
    );

    let second = pipeline.run(DeploymentMode::Production).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("dist/index.d.ts")).unwrap(), text);
    assert!(second.entries.iter().all(|e| e.result == WriteResult::Unchanged));
}

#[test]
fn test_dev_embedded_build() {
    let dir = fixture();
    let report = pipeline(&dir).run(DeploymentMode::DevServerEmbedded).unwrap();

    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["embedded", "embedded_dev", "NimbleStandaloneReact"]);
    assert_eq!(report.document_entries, vec!["embedded_dev"]);

    let html = fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    assert!(html.contains("/embedded_dev.js"));
    assert!(!html.contains("/embedded.js"));
    assert!(!html.contains("/live.js"));
}

#[test]
fn test_mode_switch_removes_stale_outputs() {
    let dir = fixture();
    let pipeline = pipeline(&dir);
    pipeline.run(DeploymentMode::Production).unwrap();
    assert!(dir.path().join("dist/live.js").exists());

    let report = pipeline.run(DeploymentMode::DevServerEmbedded).unwrap();
    assert!(!dir.path().join("dist/live.js").exists());
    assert_eq!(report.pruned, vec![dir.path().join("dist/live.js")]);
}

#[test]
fn test_entry_removed_from_project_file_is_pruned() {
    let dir = fixture();
    pipeline(&dir).run(DeploymentMode::Production).unwrap();
    assert!(dir.path().join("dist/NimbleStandaloneReact.js").exists());

    write(
        dir.path(),
        CONFIG_FILE,
        r#"{
  "entries": [
    { "name": "live", "source": "src/live.ts", "role": "live" },
    { "name": "embedded", "source": "src/embedded.ts", "role": "embedded" }
  ]
}"#,
    );
    let report = pipeline(&dir).run(DeploymentMode::Production).unwrap();
    assert_eq!(
        report.pruned,
        vec![dir.path().join("dist/NimbleStandaloneReact.js")]
    );
    assert!(dir.path().join("dist/live.js").exists());
}

#[test]
fn test_conflicting_declarations_write_nothing() {
    let dir = fixture();
    write(
        dir.path(),
        "src/embedded.ts",
        "export interface Skeleton {\n  name: string;\n}\n",
    );

    let failure = pipeline(&dir).run(DeploymentMode::Production).unwrap_err();
    assert_eq!(failure.errors.len(), 1);
    match &failure.errors[0] {
        Error::DeclarationConflict {
            type_name,
            first_entry,
            second_entry,
        } => {
            assert_eq!(type_name, "Skeleton");
            assert_eq!(first_entry, "live");
            assert_eq!(second_entry, "embedded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_unroutable_asset_fails_the_build() {
    let dir = fixture();
    write(dir.path(), "src/logo.png", "\u{89}PNG");
    write(
        dir.path(),
        "src/live.ts",
        "import logo from './logo.png';\nexport const l = logo;\n",
    );

    let failure = pipeline(&dir).run(DeploymentMode::Production).unwrap_err();
    let reports = failure.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].error_kind, "UNROUTABLE_ASSET");
    assert_eq!(reports[0].entry_names, vec!["live"]);
    assert!(reports[0].message.contains("logo.png"));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_errors_from_several_entries_are_all_reported() {
    let dir = fixture();
    write(dir.path(), "src/styles/viewer.scss", ".viewer { color: $undefined; }\n");

    let failure = pipeline(&dir).run(DeploymentMode::Production).unwrap_err();
    let mut entries: Vec<String> = failure
        .reports()
        .into_iter()
        .flat_map(|r| r.entry_names)
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["embedded", "live"]);
    assert!(failure.reports().iter().all(|r| r.error_kind == "STAGE_FAILURE"));
}

#[test]
fn test_project_file_overrides_defaults() {
    let dir = fixture();
    write(
        dir.path(),
        CONFIG_FILE,
        r#"{
  "entries": [{ "name": "live", "source": "src/live.ts", "role": "live" }],
  "output": { "dir": "public", "publicPath": "/static/" },
  "declarations": { "moduleName": "nimble", "out": "types/nimble.d.ts" }
}"#,
    );

    let report = pipeline(&dir).run(DeploymentMode::DevServerLive).unwrap();
    assert_eq!(report.entries.len(), 1);

    let html = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
    assert!(html.contains(r#"src="/static/live.js""#));
    let dts = fs::read_to_string(dir.path().join("public/types/nimble.d.ts")).unwrap();
    assert!(dts.starts_with("declare module 'nimble' {"));
}

#[test]
fn test_empty_active_set_is_a_configuration_error() {
    let dir = fixture();
    let config = ProjectConfig {
        entries: vec![vizpack_core::config::EntryConfig {
            name: "embedded_dev".into(),
            source: "src/embedded_dev.ts".into(),
            role: vizpack_core::EntryRole::EmbeddedDev,
        }],
        ..ProjectConfig::default()
    };

    let failure = Pipeline::from_config(dir.path(), config)
        .unwrap()
        .run(DeploymentMode::Production)
        .unwrap_err();
    assert_eq!(failure.reports()[0].error_kind, "CONFIGURATION_ERROR");
    assert!(!dir.path().join("dist").exists());
}
