//! Stable error codes reported by vizpack.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions; they are the
//! `errorKind` field of the structured stderr report.

/// Empty active set, malformed mode flag, bad or duplicate entry definitions.
pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";

/// No transform rule matches a file reached from an entry.
pub const UNROUTABLE_ASSET: &str = "UNROUTABLE_ASSET";

/// A transform stage rejected its input.
pub const STAGE_FAILURE: &str = "STAGE_FAILURE";

/// Two active entries declare the same type with different definitions.
pub const DECLARATION_CONFLICT: &str = "DECLARATION_CONFLICT";

/// Reading sources, resolving imports or writing outputs failed.
pub const IO_ERROR: &str = "IO_ERROR";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codes_are_screaming_snake_case() {
        let codes = [
            CONFIGURATION_ERROR,
            UNROUTABLE_ASSET,
            STAGE_FAILURE,
            DECLARATION_CONFLICT,
            IO_ERROR,
        ];

        for code in codes {
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "Code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
