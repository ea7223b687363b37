//! Stack configuration
//!
//! Every section is optional; missing values fall back to the reference
//! log delivery stack. Files are TOML or YAML, chosen by extension.

use crate::error::ConfigError;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stackgraph_kernel::{BlockPublicAccess, Compression, RetentionDays, Runtime, SourceType, TracingMode};
use stackgraph_policy::{is_token_name, Bindings};
use std::collections::BTreeMap;
use std::path::Path;

/// Stack name used when none is given on the command line
pub const DEFAULT_STACK_NAME: &str = "AwsCdkHandsonStack";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Error and application log group
    pub log_group: LogGroupConfig,
    /// Backup bucket receiving delivered records
    pub bucket: BucketConfig,
    /// Record processing function
    pub function: FunctionConfig,
    /// Delivery pipeline and its role
    pub pipeline: PipelineConfig,
    /// Values for `%TOKEN%` placeholders
    pub bindings: BTreeMap<String, String>,
}

/// `[log_group]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct LogGroupConfig {
    /// Log group name and logical id
    pub name: String,
    /// One of the supported retention periods; 0 keeps logs forever
    pub retention_days: u32,
}

impl Default for LogGroupConfig {
    fn default() -> Self {
        Self {
            name: "WebServerLogGroup".into(),
            retention_days: 365,
        }
    }
}

/// `[bucket]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct BucketConfig {
    /// Bucket name and logical id
    pub name: String,
    /// Public access block mode
    pub public_access: BlockPublicAccess,
    /// Abort incomplete multipart uploads after this many days
    pub abort_incomplete_upload_days: Option<u32>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: "log-backup-bucket-20201201".into(),
            public_access: BlockPublicAccess::BlockAll,
            abort_incomplete_upload_days: Some(7),
        }
    }
}

/// `[function]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionConfig {
    /// Function name and logical id
    pub name: String,
    /// Managed runtime
    pub runtime: Runtime,
    /// Directory bundled as the function's code asset
    pub code_path: String,
    /// Entry point inside the bundle
    pub handler: String,
    /// Invocation timeout
    pub timeout_seconds: u64,
    /// Memory size; the service default when unset
    pub memory_size_mb: Option<u32>,
    /// Tracing mode
    pub tracing: TracingMode,
    /// Environment variables
    pub environment: BTreeMap<String, String>,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: "LogProcessor".into(),
            runtime: Runtime::Nodejs12,
            code_path: "lambda".into(),
            handler: "index.handler".into(),
            timeout_seconds: 60,
            memory_size_mb: None,
            tracing: TracingMode::Active,
            environment: BTreeMap::new(),
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Delivery stream name and logical id
    pub name: String,
    /// Role the pipeline assumes
    pub role_name: String,
    /// Where records come from
    pub source: SourceType,
    /// Flush interval; must be positive
    pub buffer_interval_seconds: u32,
    /// Flush size; must be positive
    pub buffer_size_mb: u32,
    /// Compression of delivered objects
    pub compression: Compression,
    /// Key prefix for delivered objects
    pub prefix: Option<String>,
    /// Key prefix for records that failed processing
    pub error_output_prefix: Option<String>,
    /// Key the pipeline may use to decrypt and encrypt records
    pub kms_key_arn: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "LogDeliveryStream".into(),
            role_name: "FirehoseDeliveryRole".into(),
            source: SourceType::KinesisStream {
                stream_arn: "arn:aws:kinesis:%REGION_NAME%:%ACCOUNT_ID%:stream/%STREAM_NAME%"
                    .into(),
            },
            buffer_interval_seconds: 60,
            buffer_size_mb: 1,
            compression: Compression::Gzip,
            prefix: Some("logs/".into()),
            error_output_prefix: Some("errors/".into()),
            kms_key_arn: Some("arn:aws:kms:%REGION_NAME%:%ACCOUNT_ID%:key/%KEY_ID%".into()),
        }
    }
}

impl StackConfig {
    /// Load and validate a TOML or YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parse and validate TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that serde cannot express
    ///
    /// Buffering thresholds are left to the builder, which rejects them with
    /// the pipeline's logical id attached.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retention()?;
        if let Some(name) = self.bindings.keys().find(|name| !is_token_name(name)) {
            return Err(ConfigError::InvalidBindingName(name.clone()));
        }
        Ok(())
    }

    /// Log group retention as a supported period
    pub fn retention(&self) -> Result<RetentionDays, ConfigError> {
        RetentionDays::try_from(self.log_group.retention_days)
            .map_err(|_| ConfigError::InvalidRetention(self.log_group.retention_days))
    }

    /// Bindings from the file, overridden by `STACKGRAPH_BIND_*` entries of `vars`
    pub fn bindings_with_env<I>(&self, vars: I) -> Bindings
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut bindings = Bindings::from(self.bindings.clone());
        bindings.merge_env(vars);
        bindings
    }

    /// JSON Schema describing the configuration file
    #[must_use]
    pub fn schema() -> RootSchema {
        schemars::schema_for!(StackConfig)
    }
}
