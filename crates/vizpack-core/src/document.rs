//! Host document generation.

use crate::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Page used when the project has no template.
pub const FALLBACK_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Nimble Visualizer</title>
</head>
<body>
</body>
</html>
"#;

/// Renders the host document that loads the given script URLs.
pub trait DocumentTemplater: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    /// Returns an error if the template cannot be read.
    fn render(&self, script_urls: &[String]) -> Result<String, Error>;
}

/// Injects one module `<script>` tag per URL before `</body>`.
#[derive(Debug, Clone)]
pub struct HtmlTemplater {
    template: PathBuf,
}

impl HtmlTemplater {
    #[must_use]
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl DocumentTemplater for HtmlTemplater {
    fn name(&self) -> &'static str {
        "html"
    }

    fn render(&self, script_urls: &[String]) -> Result<String, Error> {
        let template = match std::fs::read_to_string(&self.template) {
            Ok(template) => template,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FALLBACK_TEMPLATE.to_string(),
            Err(e) => return Err(Error::io(&self.template, e)),
        };
        Ok(inject_scripts(&template, script_urls))
    }
}

/// Insert script tags before `</body>`, else before `</html>`, else at the end.
#[must_use]
pub fn inject_scripts(template: &str, script_urls: &[String]) -> String {
    let mut tags = String::new();
    for url in script_urls {
        let _ = writeln!(tags, r#"  <script type="module" src="{url}"></script>"#);
    }

    let lower = template.to_ascii_lowercase();
    let at = lower.rfind("</body>").or_else(|| lower.rfind("</html>"));
    match at {
        Some(at) => {
            let mut out = String::with_capacity(template.len() + tags.len() + 1);
            out.push_str(&template[..at]);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&tags);
            out.push_str(&template[at..]);
            out
        }
        None => {
            let mut out = template.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&tags);
            out
        }
    }
}
