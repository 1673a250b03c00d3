//! Raw stage: exposes file text as the default export of a module.

/// Wrap `text` as `export default "<escaped text>";`.
#[must_use]
pub fn text_module(text: &str) -> String {
    let literal = serde_json::Value::String(text.to_string()).to_string();
    format!("export default {literal};\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped_verbatim() {
        let js = text_module("line one\n\"quoted\" \\ end");
        assert_eq!(
            js,
            "export default \"line one\\n\\\"quoted\\\" \\\\ end\";\n"
        );
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(text_module(""), "export default \"\";\n");
    }
}
