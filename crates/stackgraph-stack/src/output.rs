//! Template output formats

use crate::error::SynthError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Serialization of a rendered template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl OutputFormat {
    /// Names accepted on the command line
    pub const NAMES: [&'static str; 2] = ["json", "yaml"];

    /// Serialize `template`
    pub fn render(self, template: &Value) -> Result<String, SynthError> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(template)?),
            Self::Yaml => serde_yaml::to_string(template).map_err(SynthError::Yaml),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format `{other}`")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}
