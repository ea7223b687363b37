//! Error types for configuration loading and stack synthesis

use stackgraph_kernel::StackError;
use std::path::PathBuf;

/// Configuration could not be loaded or is invalid
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid TOML: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Malformed YAML
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Extension is not `.toml`, `.yaml` or `.yml`
    #[error("unsupported config format: {} (expected .toml, .yaml or .yml)", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Retention is not one of the supported periods
    #[error("retention of {0} days is not a supported period")]
    InvalidRetention(u32),

    /// Binding name is not a valid token name
    #[error("binding name `{0}` must match [A-Z0-9_]+")]
    InvalidBindingName(String),
}

/// Building, binding or rendering a stack failed
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// Configuration failed to load or validate
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Graph construction or synthesis failed
    #[error(transparent)]
    Stack(#[from] StackError),

    /// Tokens left unbound under `--require-bound`
    #[error("unresolved deferred bindings: {}", .0.join(", "))]
    Unbound(Vec<String>),

    /// JSON serialization failed
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization failed
    #[error("failed to render YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),
}
