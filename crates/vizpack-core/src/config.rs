//! Runtime settings and the project configuration file.
//!
//! `vizpack.json` is optional; every field falls back to the layout of the
//! nimble visualizer repository.
//!
//! ```json
//! {
//!   "entries": [{ "name": "live", "source": "src/live.ts", "role": "live" }],
//!   "output": { "dir": "dist", "publicPath": "/" },
//!   "template": "src/index.html",
//!   "declarations": { "moduleName": "nimble-visualizer", "out": "index.d.ts" },
//!   "resolve": { "extensions": ["", ".ts", ".js"] },
//!   "devServer": { "port": 9000 }
//! }
//! ```

use crate::entry::{EntryPoint, EntryRegistry, EntryRole};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration file name.
pub const CONFIG_FILE: &str = "vizpack.json";

/// Runtime configuration for the vizpack CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project root.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// One entry as written in `vizpack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    pub name: String,
    pub source: PathBuf,
    pub role: EntryRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    pub dir: PathBuf,
    /// Prefix of every script URL in the host document.
    pub public_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            public_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DeclarationConfig {
    /// Namespace wrapping every merged declaration.
    pub module_name: String,
    /// Declaration file, relative to the project root.
    pub out: PathBuf,
}

impl Default for DeclarationConfig {
    fn default() -> Self {
        Self {
            module_name: "nimble-visualizer".to_string(),
            out: PathBuf::from("index.d.ts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Suffixes tried, in order, when resolving a relative import.
    pub extensions: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: vec![String::new(), ".ts".to_string(), ".js".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DevServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            host: "localhost".to_string(),
        }
    }
}

/// Contents of `vizpack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub entries: Vec<EntryConfig>,
    pub output: OutputConfig,
    /// Host document template, relative to the project root.
    pub template: PathBuf,
    pub declarations: DeclarationConfig,
    pub resolve: ResolveConfig,
    pub dev_server: DevServerConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let entry = |name: &str, role| EntryConfig {
            name: name.to_string(),
            source: PathBuf::from(format!("src/{name}.ts")),
            role,
        };
        Self {
            entries: vec![
                entry("live", EntryRole::Live),
                entry("embedded", EntryRole::Embedded),
                entry("embedded_dev", EntryRole::EmbeddedDev),
                entry("NimbleStandaloneReact", EntryRole::Library),
            ],
            output: OutputConfig::default(),
            template: PathBuf::from("src/index.html"),
            declarations: DeclarationConfig::default(),
            resolve: ResolveConfig::default(),
            dev_server: DevServerConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Build the entry registry. Sources stay relative to the project root.
    pub fn registry(&self) -> Result<EntryRegistry, Error> {
        let entries = self
            .entries
            .iter()
            .map(|e| EntryPoint::new(e.name.clone(), e.source.clone(), e.role))
            .collect();
        EntryRegistry::new(entries)
    }
}

/// Load `vizpack.json` from `root`, or the defaults when it does not exist.
pub fn load_project_config(root: &Path) -> Result<ProjectConfig, Error> {
    let path = root.join(CONFIG_FILE);
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ProjectConfig::default());
        }
        Err(source) => return Err(Error::ConfigRead { path, source }),
    };

    serde_json::from_str(&source).map_err(|source| Error::ConfigParse { path, source })
}
