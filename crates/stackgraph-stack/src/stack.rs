//! Log delivery stack composition
//!
//! Records arrive on a stream, pass through a processing function, and land
//! compressed in a backup bucket. Delivery errors go to the log group.

use crate::config::StackConfig;
use crate::error::SynthError;
use stackgraph_kernel::prelude::*;
use stackgraph_policy::ENV_PREFIX;
use std::time::Duration;
use tracing::{info, warn};

/// Handles to everything the stack declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDeliveryStack {
    /// Log group receiving delivery errors
    pub log_group: ResourceHandle,
    /// Backup bucket
    pub bucket: ResourceHandle,
    /// Record processing function
    pub function: ResourceHandle,
    /// Role the delivery service assumes
    pub role: ResourceHandle,
    /// Delivery pipeline
    pub stream: ResourceHandle,
}

/// Declare the log delivery stack into `builder`
pub fn build_log_delivery_stack(
    builder: &mut GraphBuilder,
    config: &StackConfig,
) -> Result<LogDeliveryStack, SynthError> {
    let log_group = builder.declare_logging_sink(&config.log_group.name, config.retention()?)?;

    let lifecycle_rules = config
        .bucket
        .abort_incomplete_upload_days
        .map(LifecycleRule::abort_incomplete_uploads)
        .into_iter()
        .collect();
    let bucket = builder.declare_storage_sink(
        &config.bucket.name,
        config.bucket.public_access,
        lifecycle_rules,
    )?;

    let function_config = &config.function;
    let mut function_props = FunctionProps::new(
        function_config.runtime,
        CodeLocation::Asset {
            path: function_config.code_path.clone(),
        },
        function_config.handler.clone(),
    );
    function_props.timeout = Duration::from_secs(function_config.timeout_seconds);
    function_props.memory_size_mb = function_config.memory_size_mb;
    function_props.tracing = function_config.tracing;
    function_props.environment = function_config.environment.clone();
    let function = builder.declare_function(&function_config.name, function_props)?;

    let role = builder.declare_assumable_role(
        &config.pipeline.role_name,
        Principal::service("firehose.amazonaws.com"),
        delivery_role_statements(config, &bucket, &log_group),
    )?;
    builder.grant_invoke(&function, &role)?;

    let pipeline = &config.pipeline;
    let mut props = DeliveryPipelineProps::new(bucket.clone(), role.clone());
    props.source = pipeline.source.clone();
    props.buffer_interval_seconds = pipeline.buffer_interval_seconds;
    props.buffer_size_mb = pipeline.buffer_size_mb;
    props.compression = pipeline.compression;
    props.prefix = pipeline.prefix.clone();
    props.error_output_prefix = pipeline.error_output_prefix.clone();
    props.processing_stages = vec![function.clone()];
    props.error_log_group = Some(log_group.clone());
    let stream = builder.declare_delivery_pipeline(&pipeline.name, props)?;

    Ok(LogDeliveryStack {
        log_group,
        bucket,
        function,
        role,
        stream,
    })
}

/// Inline policy of the delivery role, minus the invoke grant
///
/// Stream, key and log ARNs carry `%REGION_NAME%`/`%ACCOUNT_ID%` tokens;
/// they are bound after synthesis.
#[must_use]
pub fn delivery_role_statements(
    config: &StackConfig,
    bucket: &ResourceHandle,
    log_group: &ResourceHandle,
) -> Vec<PolicyStatement> {
    let objects = Pattern::attr(bucket.arn()).then_text("/*");
    let mut statements = vec![PolicyStatement::allow()
        .actions([
            "s3:AbortMultipartUpload",
            "s3:GetBucketLocation",
            "s3:GetObject",
            "s3:ListBucket",
            "s3:ListBucketMultipartUploads",
            "s3:PutObject",
        ])
        .resource(bucket.arn())
        .resource(objects.clone())];

    if let SourceType::KinesisStream { stream_arn } = &config.pipeline.source {
        statements.push(
            PolicyStatement::allow()
                .actions([
                    "kinesis:DescribeStream",
                    "kinesis:GetShardIterator",
                    "kinesis:GetRecords",
                    "kinesis:ListShards",
                ])
                .resource(stream_arn.as_str()),
        );
    }

    if let Some(key_arn) = &config.pipeline.kms_key_arn {
        statements.push(
            PolicyStatement::allow()
                .actions(["kms:Decrypt", "kms:GenerateDataKey"])
                .resource(key_arn.as_str())
                .condition("StringEquals", "kms:ViaService", "s3.%REGION_NAME%.amazonaws.com")
                .condition("StringLike", "kms:EncryptionContext:aws:s3:arn", objects),
        );
    }

    statements.push(
        PolicyStatement::allow().action("logs:PutLogEvents").resource(
            Pattern::literal("arn:aws:logs:%REGION_NAME%:%ACCOUNT_ID%:log-group:")
                .then_attr(log_group.name())
                .then_text(":log-stream:*"),
        ),
    );
    statements
}

/// Build and synthesize the stack in one go
pub fn synthesize(stack_name: &str, config: &StackConfig) -> Result<RealizationPlan, SynthError> {
    let mut builder = GraphBuilder::new(stack_name);
    build_log_delivery_stack(&mut builder, config)?;
    Ok(builder.synthesize()?)
}

/// Substitute deferred bindings
///
/// Unresolved tokens are logged and passed through, or rejected when
/// `require_bound` is set.
pub fn bind_plan(
    plan: &RealizationPlan,
    bindings: &Bindings,
    require_bound: bool,
) -> Result<RealizationPlan, SynthError> {
    let bound = plan.bind(bindings);
    let unresolved = bound.unresolved_tokens();

    if require_bound && !unresolved.is_empty() {
        return Err(SynthError::Unbound(unresolved.into_iter().collect()));
    }
    for token in &unresolved {
        warn!(
            token = %token,
            variable = %format!("{ENV_PREFIX}{token}"),
            "deferred binding left unresolved"
        );
    }

    info!(
        stack = plan.stack_name(),
        bound = bindings.len(),
        unresolved = unresolved.len(),
        fingerprint = %bound.fingerprint_hex(),
        "applied deferred bindings"
    );
    Ok(bound)
}
