//! Style chain: Sass compile, then CSS composition, then runtime injection.

use crate::css::sass::{compile_sass, SassError, SassOptions};
use crate::css::{compose_css, injection_module, CssError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

/// Sub-steps of the style stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleStep {
    SassCompile,
    CssCompose,
    RuntimeInject,
}

impl StyleStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SassCompile => "sass",
            Self::CssCompose => "css",
            Self::RuntimeInject => "inject",
        }
    }
}

/// Execution order of the style steps. Never reordered.
pub const STYLE_STEPS: [StyleStep; 3] = [
    StyleStep::SassCompile,
    StyleStep::CssCompose,
    StyleStep::RuntimeInject,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error(transparent)]
    Sass(#[from] SassError),

    #[error(transparent)]
    Css(#[from] CssError),
}

/// Injection module for one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOutput {
    pub code: String,
    /// Files the Sass compiler read besides `path` itself.
    pub loaded_files: Vec<PathBuf>,
}

/// Run a Sass source through all [`STYLE_STEPS`] and return the injection
/// module.
///
/// `path` is the on-disk location of the stylesheet; its directory is the
/// base for `@use` and `@import`.
pub fn run_style_pipeline(path: &Path, source: &str) -> Result<StyleOutput, StyleError> {
    let mut text = source.to_string();
    let mut loaded_files = Vec::new();
    for step in STYLE_STEPS {
        trace!(path = %path.display(), step = step.as_str(), "style step");
        text = match step {
            StyleStep::SassCompile => {
                let out = compile_sass(&text, &SassOptions::for_file(path))?;
                loaded_files = out.loaded_files;
                out.css
            }
            StyleStep::CssCompose => compose_css(&text, path)?,
            StyleStep::RuntimeInject => injection_module(&text),
        };
    }
    Ok(StyleOutput {
        code: text,
        loaded_files,
    })
}
