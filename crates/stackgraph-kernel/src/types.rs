//! Resource kinds and the configuration enums recognized on declarations
//!
//! Every option here only shapes emitted properties; none of them changes
//! how the builder behaves.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Kinds of resource the builder can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Named log group
    LogGroup,
    /// Storage bucket
    Bucket,
    /// Assumable identity
    Role,
    /// Managed function
    Function,
    /// Streaming delivery pipeline
    DeliveryStream,
}

impl ResourceType {
    /// Resource type name in the emitted template
    #[must_use]
    pub fn template_type(self) -> &'static str {
        match self {
            Self::LogGroup => "AWS::Logs::LogGroup",
            Self::Bucket => "AWS::S3::Bucket",
            Self::Role => "AWS::IAM::Role",
            Self::Function => "AWS::Lambda::Function",
            Self::DeliveryStream => "AWS::KinesisFirehose::DeliveryStream",
        }
    }

    /// Whether descriptors of this kind hold an inline policy
    #[must_use]
    pub fn carries_policy(self) -> bool {
        matches!(self, Self::Role | Self::Function)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::LogGroup => "LogGroup",
            Self::Bucket => "Bucket",
            Self::Role => "Role",
            Self::Function => "Function",
            Self::DeliveryStream => "DeliveryStream",
        })
    }
}

/// Graph lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    /// Accepting declarations
    Building,
    /// Synthesized; no further declarations
    Sealed,
}

/// Log retention periods accepted by the log service
///
/// Serialized as a day count, with `0` standing for [`RetentionDays::Infinite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum RetentionDays {
    /// 1 day
    OneDay,
    /// 3 days
    ThreeDays,
    /// 5 days
    FiveDays,
    /// 7 days
    OneWeek,
    /// 14 days
    TwoWeeks,
    /// 30 days
    OneMonth,
    /// 60 days
    TwoMonths,
    /// 90 days
    ThreeMonths,
    /// 120 days
    FourMonths,
    /// 150 days
    FiveMonths,
    /// 180 days
    SixMonths,
    /// 365 days
    OneYear,
    /// 400 days
    ThirteenMonths,
    /// 545 days
    EighteenMonths,
    /// 731 days
    TwoYears,
    /// 1827 days
    FiveYears,
    /// 3653 days
    TenYears,
    /// Never expire
    Infinite,
}

impl RetentionDays {
    const TABLE: [(RetentionDays, u32); 17] = [
        (Self::OneDay, 1),
        (Self::ThreeDays, 3),
        (Self::FiveDays, 5),
        (Self::OneWeek, 7),
        (Self::TwoWeeks, 14),
        (Self::OneMonth, 30),
        (Self::TwoMonths, 60),
        (Self::ThreeMonths, 90),
        (Self::FourMonths, 120),
        (Self::FiveMonths, 150),
        (Self::SixMonths, 180),
        (Self::OneYear, 365),
        (Self::ThirteenMonths, 400),
        (Self::EighteenMonths, 545),
        (Self::TwoYears, 731),
        (Self::FiveYears, 1827),
        (Self::TenYears, 3653),
    ];

    /// Day count, or `None` for infinite retention
    #[must_use]
    pub fn days(self) -> Option<u32> {
        Self::TABLE
            .iter()
            .find(|(r, _)| *r == self)
            .map(|(_, d)| *d)
    }
}

impl TryFrom<u32> for RetentionDays {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        if days == 0 {
            return Ok(Self::Infinite);
        }
        Self::TABLE
            .iter()
            .find(|(_, d)| *d == days)
            .map(|(r, _)| *r)
            .ok_or_else(|| format!("{days} is not a supported retention period"))
    }
}

impl From<RetentionDays> for u32 {
    fn from(value: RetentionDays) -> Self {
        value.days().unwrap_or(0)
    }
}

/// Public-access-block mode for a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockPublicAccess {
    /// Block ACLs and bucket policies
    #[default]
    BlockAll,
    /// Block ACLs only
    BlockAcls,
    /// No block configuration emitted
    Off,
}

impl BlockPublicAccess {
    /// `PublicAccessBlockConfiguration` value, if any
    #[must_use]
    pub fn to_template(self) -> Option<Value> {
        match self {
            Self::BlockAll => Some(json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            })),
            Self::BlockAcls => Some(json!({
                "BlockPublicAcls": true,
                "IgnorePublicAcls": true,
            })),
            Self::Off => None,
        }
    }
}

/// One bucket lifecycle rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Rule identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Disabled rules are emitted but not applied
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Abort multipart uploads left incomplete for this many days
    #[serde(default)]
    pub abort_incomplete_multipart_upload_after_days: Option<u32>,
    /// Expire objects after this many days
    #[serde(default)]
    pub expiration_days: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl LifecycleRule {
    /// Rule that only aborts stale multipart uploads
    #[must_use]
    pub fn abort_incomplete_uploads(after_days: u32) -> Self {
        Self {
            id: None,
            enabled: true,
            abort_incomplete_multipart_upload_after_days: Some(after_days),
            expiration_days: None,
        }
    }

    /// Template value for the rule
    #[must_use]
    pub fn to_template(&self) -> Value {
        let mut rule = serde_json::Map::new();
        if let Some(id) = &self.id {
            rule.insert("Id".into(), json!(id));
        }
        rule.insert(
            "Status".into(),
            json!(if self.enabled { "Enabled" } else { "Disabled" }),
        );
        if let Some(days) = self.abort_incomplete_multipart_upload_after_days {
            rule.insert(
                "AbortIncompleteMultipartUpload".into(),
                json!({ "DaysAfterInitiation": days }),
            );
        }
        if let Some(days) = self.expiration_days {
            rule.insert("ExpirationInDays".into(), json!(days));
        }
        Value::Object(rule)
    }
}

/// Managed execution environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Runtime {
    /// Node.js 12
    #[serde(rename = "nodejs12.x")]
    Nodejs12,
    /// Node.js 14
    #[serde(rename = "nodejs14.x")]
    Nodejs14,
    /// Node.js 16
    #[serde(rename = "nodejs16.x")]
    Nodejs16,
    /// Python 3.8
    #[serde(rename = "python3.8")]
    Python38,
    /// Python 3.9
    #[serde(rename = "python3.9")]
    Python39,
    /// Java 11
    #[serde(rename = "java11")]
    Java11,
    /// Go 1.x
    #[serde(rename = "go1.x")]
    Go1,
    /// Custom runtime on Amazon Linux 2
    #[serde(rename = "provided.al2")]
    ProvidedAl2,
}

impl Runtime {
    /// Runtime identifier string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nodejs12 => "nodejs12.x",
            Self::Nodejs14 => "nodejs14.x",
            Self::Nodejs16 => "nodejs16.x",
            Self::Python38 => "python3.8",
            Self::Python39 => "python3.9",
            Self::Java11 => "java11",
            Self::Go1 => "go1.x",
            Self::ProvidedAl2 => "provided.al2",
        }
    }
}

/// Function tracing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TracingMode {
    /// Tracing off unless the caller is traced
    #[default]
    PassThrough,
    /// Sample and trace every invocation
    Active,
}

impl TracingMode {
    /// Mode keyword in the template
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "PassThrough",
            Self::Active => "Active",
        }
    }
}

/// Where a function's bundled code comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeLocation {
    /// Local directory bundled and uploaded by the deployment engine
    ///
    /// Rendered against the `%ASSETS_BUCKET%` deferred binding.
    Asset {
        /// Directory path relative to the project root
        path: String,
    },
    /// Archive already uploaded to a bucket
    Bucket {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
    /// Source embedded in the template
    Inline {
        /// Function source
        source: String,
    },
}

impl CodeLocation {
    /// `Code` property value
    #[must_use]
    pub fn to_template(&self) -> Value {
        match self {
            Self::Asset { path } => json!({
                "S3Bucket": "%ASSETS_BUCKET%",
                "S3Key": format!("{}.zip", path.trim_end_matches('/')),
            }),
            Self::Bucket { bucket, key } => json!({ "S3Bucket": bucket, "S3Key": key }),
            Self::Inline { source } => json!({ "ZipFile": source }),
        }
    }
}

/// Compression applied to delivered objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// No compression
    #[default]
    Uncompressed,
    /// gzip
    Gzip,
    /// zip
    Zip,
    /// Snappy framing
    Snappy,
    /// Hadoop-compatible Snappy
    HadoopSnappy,
}

impl Compression {
    /// Format keyword in the template
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uncompressed => "UNCOMPRESSED",
            Self::Gzip => "GZIP",
            Self::Zip => "ZIP",
            Self::Snappy => "Snappy",
            Self::HadoopSnappy => "HADOOP_SNAPPY",
        }
    }
}

/// Where a delivery pipeline reads records from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceType {
    /// Producers write directly to the pipeline
    #[default]
    DirectPut,
    /// The pipeline reads an existing stream
    KinesisStream {
        /// Stream ARN; usually written with deferred binding tokens
        stream_arn: String,
    },
}

impl SourceType {
    /// `DeliveryStreamType` keyword
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectPut => "DirectPut",
            Self::KinesisStream { .. } => "KinesisStreamAsSource",
        }
    }
}

/// Whole seconds of a timeout, rounded up
#[must_use]
pub fn timeout_seconds(timeout: Duration) -> u64 {
    let secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
