//! Sass/SCSS compilation using grass.

use grass::Fs;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    /// Extra load paths for `@use`/`@import`. The file's own directory is
    /// always searched.
    pub load_paths: Vec<PathBuf>,
    /// Source path, used for syntax detection and relative imports.
    pub filename: Option<PathBuf>,
}

impl SassOptions {
    #[must_use]
    pub fn for_file(path: &Path) -> Self {
        Self {
            load_paths: Vec::new(),
            filename: Some(path.to_path_buf()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SassError {
    #[error("sass compile error: {0}")]
    Compile(String),
}

/// Compiled CSS plus every file grass read to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SassOutput {
    pub css: String,
    /// Partials and imported stylesheets, in path order.
    pub loaded_files: Vec<PathBuf>,
}

/// Delegates to [`grass::StdFs`] and remembers which files were read.
#[derive(Debug, Default)]
struct RecordingFs {
    read: RefCell<BTreeSet<PathBuf>>,
}

impl Fs for RecordingFs {
    fn is_dir(&self, path: &Path) -> bool {
        grass::StdFs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        grass::StdFs.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = grass::StdFs.read(path)?;
        self.read.borrow_mut().insert(path.to_path_buf());
        Ok(bytes)
    }
}

/// Compile Sass to plain CSS in expanded style.
///
/// `.sass` files are parsed with the indented syntax; everything else as SCSS.
pub fn compile_sass(source: &str, options: &SassOptions) -> Result<SassOutput, SassError> {
    let fs = RecordingFs::default();
    let mut grass_options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .fs(&fs);

    if options.filename.as_deref().is_some_and(is_indented_syntax) {
        grass_options = grass_options.input_syntax(grass::InputSyntax::Sass);
    }
    for path in &options.load_paths {
        grass_options = grass_options.load_path(path);
    }
    if let Some(parent) = options.filename.as_deref().and_then(Path::parent) {
        grass_options = grass_options.load_path(parent);
    }

    let css = grass::from_string(source.to_string(), &grass_options)
        .map_err(|e| SassError::Compile(e.to_string()))?;
    drop(grass_options);

    Ok(SassOutput {
        css,
        loaded_files: fs.read.into_inner().into_iter().collect(),
    })
}

fn is_indented_syntax(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sass"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scss_variables_and_nesting() {
        let scss = r"
            $accent: #ff0000;
            .viewer {
                .label {
                    color: $accent;
                }
            }
        ";
        let out = compile_sass(scss, &SassOptions::default()).unwrap();
        assert!(out.css.contains(".viewer .label"));
        assert!(out.css.contains("color: #ff0000"));
        assert!(out.loaded_files.is_empty());
    }

    #[test]
    fn test_indented_syntax_by_extension() {
        let sass = "$w: 10px\n.panel\n  width: $w\n";
        let out = compile_sass(sass, &SassOptions::for_file(Path::new("src/panel.sass"))).unwrap();
        assert!(out.css.contains("width: 10px"));
    }

    #[test]
    fn test_undefined_variable_fails() {
        let err = compile_sass(".a { color: $missing; }", &SassOptions::default()).unwrap_err();
        assert!(err.to_string().contains("sass compile error"));
    }

    #[test]
    fn test_use_resolves_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_theme.scss"), "$bg: white;").unwrap();
        let path = dir.path().join("main.scss");

        let out = compile_sass(
            "@use 'theme';\nbody { background: theme.$bg; }",
            &SassOptions::for_file(&path),
        )
        .unwrap();
        assert!(out.css.contains("background: white"));
    }

    #[test]
    fn test_loaded_partials_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("shared")).unwrap();
        std::fs::write(
            dir.path().join("_theme.scss"),
            "@use 'shared/colors';\n$bg: colors.$ink;",
        )
        .unwrap();
        std::fs::write(dir.path().join("shared/_colors.scss"), "$ink: black;").unwrap();
        let path = dir.path().join("main.scss");

        let out = compile_sass(
            "@use 'theme';\nbody { color: theme.$bg; }",
            &SassOptions::for_file(&path),
        )
        .unwrap();
        let names: Vec<_> = out
            .loaded_files
            .iter()
            .filter_map(|p| p.file_name())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&std::ffi::OsStr::new("_theme.scss")));
        assert!(names.contains(&std::ffi::OsStr::new("_colors.scss")));
    }

    #[test]
    fn test_failed_reads_are_not_recorded() {
        let fs = RecordingFs::default();
        assert!(fs.read(Path::new("/definitely/not/here.scss")).is_err());
        assert!(fs.read.borrow().is_empty());
    }
}
