#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Multi-target build orchestration for the nimble visualizer.
//!
//! One source tree, four deployment shapes: the deployment mode decides which
//! entries are compiled, every file reached from an entry is routed to a
//! transform chain, each active entry becomes one output file, and the
//! exported types of all active entries are merged into one declaration file.

pub mod bundler;
pub mod codes;
pub mod config;
pub mod css;
pub mod declarations;
pub mod dev;
pub mod document;
pub mod emit;
pub mod entry;
pub mod error;
pub mod mode;
pub mod pipeline;
pub mod transform;

pub use bundler::{BundlerService, CompiledArtifact, InProcessBundler};
pub use config::{load_project_config, Config, ProjectConfig, CONFIG_FILE};
pub use declarations::{aggregate, AggregatedDeclaration, MergeOutcome};
pub use dev::{DevSession, SessionEvent, SessionState};
pub use document::{DocumentTemplater, HtmlTemplater};
pub use emit::{OutputEmitter, WriteResult};
pub use entry::{
    document_exclusions, resolve_active_entries, ActiveSet, EntryPoint, EntryRegistry, EntryRole,
};
pub use error::{BuildFailure, Error, ErrorReport};
pub use mode::DeploymentMode;
pub use pipeline::{BuildReport, EntryReport, Pipeline};
pub use transform::{RuleTable, Stage, TransformError, Transformer};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
