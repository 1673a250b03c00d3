use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtime context that decides which entries are active.
///
/// Chosen once per invocation and passed explicitly to every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentMode {
    #[serde(rename = "production")]
    Production,
    #[serde(rename = "dev-embedded")]
    DevServerEmbedded,
    #[serde(rename = "dev-live")]
    DevServerLive,
}

impl DeploymentMode {
    pub const ALL: [Self; 3] = [
        Self::Production,
        Self::DevServerEmbedded,
        Self::DevServerLive,
    ];

    /// The CLI flag value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::DevServerEmbedded => "dev-embedded",
            Self::DevServerLive => "dev-live",
        }
    }

    #[must_use]
    pub fn is_dev_server(&self) -> bool {
        !matches!(self, Self::Production)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "malformed mode flag `{s}` (expected production, dev-embedded or dev-live)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_flag_values() {
        for mode in DeploymentMode::ALL {
            assert_eq!(mode.as_str().parse::<DeploymentMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_malformed_flag_is_configuration_error() {
        let err = "staging".parse::<DeploymentMode>().unwrap_err();
        assert_eq!(err.code(), crate::codes::CONFIGURATION_ERROR);
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn test_serde_uses_flag_values() {
        let json = serde_json::to_string(&DeploymentMode::DevServerEmbedded).unwrap();
        assert_eq!(json, "\"dev-embedded\"");
    }
}
