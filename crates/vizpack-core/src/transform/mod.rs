//! Transform Router and chain execution.
//!
//! Every source file reached from an entry is matched against an ordered rule
//! table; the first matching rule's chain is applied stage by stage, each
//! stage consuming the previous stage's output.
//!
//! ```text
//! *.js, *.ts (outside node_modules)  → compile
//! *.sass, *.scss                     → style (sass → css compose → inject)
//! *.txt                              → raw
//! ```

pub mod compile;
pub mod raw;
pub mod style;

pub use compile::{CompileError, CompileOutput, CompilerBackend, SwcBackend, TypeDeclaration};
pub use style::{StyleOutput, StyleStep, STYLE_STEPS};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// One stage of a transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Lower a typed module and extract its exported declarations.
    Compile,
    /// Sass compile, CSS composition and runtime injection, in that order.
    Style,
    /// Expose text as a module-loadable string.
    Raw,
}

impl Stage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Style => "style",
            Self::Raw => "raw",
        }
    }
}

/// File-extension predicate of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPattern {
    extensions: Vec<String>,
    case_insensitive: bool,
    exclude_segment: Option<String>,
}

impl ExtensionPattern {
    /// Match any of `extensions` (without the leading dot), case-sensitively.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            case_insensitive: false,
            exclude_segment: None,
        }
    }

    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Never match paths that contain this directory component.
    #[must_use]
    pub fn excluding(mut self, segment: impl Into<String>) -> Self {
        self.exclude_segment = Some(segment.into());
        self
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(segment) = &self.exclude_segment {
            if path
                .components()
                .any(|c| c.as_os_str().to_str() == Some(segment.as_str()))
            {
                return false;
            }
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.extensions.iter().any(|candidate| {
            if self.case_insensitive {
                candidate.eq_ignore_ascii_case(ext)
            } else {
                candidate == ext
            }
        })
    }
}

/// A predicate and the chain applied to files it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRule {
    pub pattern: ExtensionPattern,
    pub chain: Vec<Stage>,
}

impl TransformRule {
    #[must_use]
    pub fn new(pattern: ExtensionPattern, chain: Vec<Stage>) -> Self {
        Self { pattern, chain }
    }
}

/// Ordered rule table; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<TransformRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(vec![
            TransformRule::new(
                ExtensionPattern::new(["js", "ts"]).excluding("node_modules"),
                vec![Stage::Compile],
            ),
            TransformRule::new(
                ExtensionPattern::new(["sass", "scss"]).case_insensitive(),
                vec![Stage::Style],
            ),
            TransformRule::new(
                ExtensionPattern::new(["txt"]).case_insensitive(),
                vec![Stage::Raw],
            ),
        ])
    }
}

impl RuleTable {
    #[must_use]
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    /// Chain for `path`, from the first rule whose pattern matches.
    pub fn route_for(&self, path: &Path) -> Result<&[Stage], TransformError> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.chain.as_slice())
            .ok_or_else(|| TransformError::Unroutable {
                path: path.to_path_buf(),
            })
    }
}

/// Output of a chain: loadable module code plus what was found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOutput {
    pub code: String,
    pub declarations: Vec<TypeDeclaration>,
    /// Static import specifiers of the source, including ones the compile
    /// stage removed because they only carried types.
    pub source_imports: Vec<String>,
    /// Files read while transforming besides the module itself, such as Sass
    /// partials. Relative to the working directory unless the root passed to
    /// [`Transformer::transform_in`] was absolute.
    pub loaded_files: Vec<PathBuf>,
}

/// Failure while routing or transforming one file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("no transform rule matches {}", path.display())]
    Unroutable { path: PathBuf },

    #[error("stage `{stage}` failed on {}: {message}", path.display())]
    Stage {
        stage: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl TransformError {
    /// Attach the entry this file was reached from.
    #[must_use]
    pub fn into_error(self, entry: &str) -> crate::Error {
        match self {
            Self::Unroutable { path } => crate::Error::UnroutableAsset {
                entry: entry.to_string(),
                path,
            },
            Self::Stage {
                stage,
                path,
                message,
            } => crate::Error::StageFailure {
                entry: entry.to_string(),
                path,
                stage,
                message,
            },
        }
    }
}

/// Routes files and runs their chains.
///
/// `Transformer` is `Send + Sync`; each call touches only its own file.
#[derive(Clone)]
pub struct Transformer {
    rules: RuleTable,
    compiler: Arc<dyn CompilerBackend>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(RuleTable::default(), Arc::new(SwcBackend::new()))
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("rules", &self.rules)
            .field("compiler", &self.compiler.name())
            .finish()
    }
}

impl Transformer {
    #[must_use]
    pub fn new(rules: RuleTable, compiler: Arc<dyn CompilerBackend>) -> Self {
        Self { rules, compiler }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Route `path` and run its chain over `source`.
    ///
    /// Stylesheets load their `@use`/`@import` targets relative to `path`.
    pub fn transform(&self, path: &Path, source: &str) -> Result<ModuleOutput, TransformError> {
        self.transform_in(Path::new(""), path, source)
    }

    /// Like [`transform`](Self::transform) for a `path` relative to `root`.
    ///
    /// Routing and errors use `path`; files are loaded from `root.join(path)`,
    /// so the result does not depend on the working directory.
    pub fn transform_in(
        &self,
        root: &Path,
        path: &Path,
        source: &str,
    ) -> Result<ModuleOutput, TransformError> {
        let chain = self.rules.route_for(path)?;
        let mut output = ModuleOutput {
            code: source.to_string(),
            ..ModuleOutput::default()
        };

        for stage in chain {
            debug!(file = %path.display(), stage = stage.as_str(), "running stage");
            output = self.apply(*stage, root, path, output)?;
        }

        Ok(output)
    }

    fn apply(
        &self,
        stage: Stage,
        root: &Path,
        path: &Path,
        input: ModuleOutput,
    ) -> Result<ModuleOutput, TransformError> {
        let fail = |message: String| TransformError::Stage {
            stage: stage.as_str(),
            path: path.to_path_buf(),
            message,
        };

        match stage {
            Stage::Compile => {
                let compiled = self
                    .compiler
                    .compile(path, &input.code)
                    .map_err(|e| fail(e.to_string()))?;
                let mut output = input;
                output.code = compiled.code;
                output.declarations.extend(compiled.declarations);
                output.source_imports.extend(compiled.source_imports);
                Ok(output)
            }
            Stage::Style => {
                let styled = style::run_style_pipeline(&root.join(path), &input.code)
                    .map_err(|e| fail(e.to_string()))?;
                let mut output = input;
                output.code = styled.code;
                output.loaded_files.extend(styled.loaded_files);
                Ok(output)
            }
            Stage::Raw => Ok(ModuleOutput {
                code: raw::text_module(&input.code),
                ..input
            }),
        }
    }
}
