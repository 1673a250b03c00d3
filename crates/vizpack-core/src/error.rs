use crate::codes;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for vizpack operations.
///
/// Every variant carries the entry and/or file it concerns so callers can
/// report it without extra context.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no transform rule matches {} (reached from entry `{entry}`)", path.display())]
    UnroutableAsset { entry: String, path: PathBuf },

    #[error("stage `{stage}` failed on {} (entry `{entry}`): {message}", path.display())]
    StageFailure {
        entry: String,
        path: PathBuf,
        stage: &'static str,
        message: String,
    },

    #[error(
        "type `{type_name}` is declared differently by entries `{first_entry}` and `{second_entry}`"
    )]
    DeclarationConflict {
        type_name: String,
        first_entry: String,
        second_entry: String,
    },

    #[error("cannot resolve '{specifier}' from {from} (entry `{entry}`)")]
    UnresolvedImport {
        entry: String,
        specifier: String,
        from: String,
    },

    #[error("failed to read {} (entry `{entry}`): {source}", path.display())]
    ModuleRead {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable error code (see [`crate::codes`]).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::ConfigRead { .. } | Self::ConfigParse { .. } => {
                codes::CONFIGURATION_ERROR
            }
            Self::UnroutableAsset { .. } => codes::UNROUTABLE_ASSET,
            Self::StageFailure { .. } => codes::STAGE_FAILURE,
            Self::DeclarationConflict { .. } => codes::DECLARATION_CONFLICT,
            Self::UnresolvedImport { .. } | Self::ModuleRead { .. } | Self::Io { .. } => {
                codes::IO_ERROR
            }
        }
    }

    /// Entries this error is attributed to.
    #[must_use]
    pub fn entry_names(&self) -> Vec<String> {
        match self {
            Self::UnroutableAsset { entry, .. }
            | Self::StageFailure { entry, .. }
            | Self::UnresolvedImport { entry, .. }
            | Self::ModuleRead { entry, .. } => vec![entry.clone()],
            Self::DeclarationConflict {
                first_entry,
                second_entry,
                ..
            } => vec![first_entry.clone(), second_entry.clone()],
            _ => Vec::new(),
        }
    }

    /// Structured form written to stderr by the CLI.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error_kind: self.code(),
            entry_names: self.entry_names(),
            message: self.to_string(),
        }
    }
}

/// One line of the structured error listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_kind: &'static str,
    pub entry_names: Vec<String>,
    pub message: String,
}

/// A failed pipeline run: every error collected before the run was aborted.
#[derive(Debug)]
pub struct BuildFailure {
    pub errors: Vec<Error>,
}

impl BuildFailure {
    #[must_use]
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.errors.iter().map(Error::report).collect()
    }
}

impl From<Error> for BuildFailure {
    fn from(error: Error) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_report_names_both_entries() {
        let error = Error::DeclarationConflict {
            type_name: "Foo".to_string(),
            first_entry: "live".to_string(),
            second_entry: "NimbleStandaloneReact".to_string(),
        };
        let report = error.report();
        assert_eq!(report.error_kind, codes::DECLARATION_CONFLICT);
        assert_eq!(report.entry_names, vec!["live", "NimbleStandaloneReact"]);
        assert!(report.message.contains("Foo"));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = Error::configuration("empty active set").report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errorKind"], "CONFIGURATION_ERROR");
        assert!(json["entryNames"].as_array().unwrap().is_empty());
        assert!(json["message"].as_str().unwrap().contains("empty active set"));
    }

    #[test]
    fn test_build_failure_display_lists_errors() {
        let failure = BuildFailure {
            errors: vec![
                Error::configuration("a"),
                Error::UnroutableAsset {
                    entry: "live".to_string(),
                    path: PathBuf::from("src/logo.png"),
                },
            ],
        };
        let text = failure.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("src/logo.png"));
    }
}
