//! Stylesheet processing: Sass compilation, CSS composition with lightningcss,
//! and the runtime injection module.

pub mod sass;

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CssError {
    #[error("css parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("css print error: {0}")]
    Print(String),
}

/// Parse plain CSS, lower it for the default browser targets and print it
/// back in readable form.
///
/// Lowering happens in the printer only: nested rules are flattened for the
/// targets, but rules are never merged, reordered or dropped.
pub fn compose_css(source: &str, path: &Path) -> Result<String, CssError> {
    let file = path.display().to_string();
    let stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: file.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| CssError::Parse {
        file,
        message: e.to_string(),
    })?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: false,
            targets: Targets::from(default_browser_targets()),
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Print(e.to_string()))?;

    Ok(output.code)
}

/// Chrome 80+, Firefox 75+, Safari 13+, Edge 80+.
fn default_browser_targets() -> Browsers {
    Browsers {
        chrome: Some(80 << 16),
        firefox: Some(75 << 16),
        safari: Some(13 << 16),
        edge: Some(80 << 16),
        ..Browsers::default()
    }
}

/// Build the module that inserts `css` into the document when loaded.
///
/// The stylesheet text is embedded as a JSON string literal so no escaping
/// can break out of it. The module default-exports the CSS text.
#[must_use]
pub fn injection_module(css: &str) -> String {
    let literal = serde_json::Value::String(css.to_string()).to_string();
    format!(
        r#"const css = {literal};
const style = document.createElement('style');
style.setAttribute('data-vizpack', '');
style.textContent = css;
document.head.appendChild(style);
export default css;
"#
    )
}
