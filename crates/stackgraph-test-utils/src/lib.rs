//! Testing utilities for the stackgraph workspace
//!
//! Shared fixtures, declaration helpers, and plan assertions.

#![allow(missing_docs)]

use stackgraph_kernel::prelude::*;

pub const LOG_GROUP: &str = "WebServerLogGroup";
pub const BACKUP_BUCKET: &str = "log-backup-bucket-20201201";
pub const BACKUP_BUCKET_KEY: &str = "logbackupbucket20201201";

#[derive(Debug, Clone)]
pub struct DeliveryHandles {
    pub log_group: ResourceHandle,
    pub bucket: ResourceHandle,
    pub function: ResourceHandle,
    pub role: ResourceHandle,
    pub stream: ResourceHandle,
}

pub fn function_props() -> FunctionProps {
    FunctionProps::new(
        Runtime::Nodejs12,
        CodeLocation::Asset {
            path: "lambda".into(),
        },
        "index.handler",
    )
}

/// Object and bucket-level S3 actions on `bucket`, referencing its ARN twice
pub fn bucket_statement(bucket: &ResourceHandle) -> PolicyStatement {
    PolicyStatement::allow()
        .actions([
            "s3:AbortMultipartUpload",
            "s3:GetBucketLocation",
            "s3:GetObject",
            "s3:ListBucket",
            "s3:ListBucketMultipartUploads",
            "s3:PutObject",
        ])
        .resource(bucket.arn())
        .resource(Pattern::attr(bucket.arn()).then_text("/*"))
}

pub fn firehose_principal() -> Principal {
    Principal::service("firehose.amazonaws.com")
}

/// Declare a small but complete delivery graph
pub fn declare_delivery_graph(builder: &mut GraphBuilder) -> Result<DeliveryHandles, StackError> {
    let log_group = builder.declare_logging_sink(LOG_GROUP, RetentionDays::OneYear)?;
    let bucket = builder.declare_storage_sink(
        BACKUP_BUCKET,
        BlockPublicAccess::BlockAll,
        vec![LifecycleRule::abort_incomplete_uploads(7)],
    )?;
    let function = builder.declare_function("LogProcessor", function_props())?;
    let role = builder.declare_assumable_role(
        "DeliveryRole",
        firehose_principal(),
        vec![bucket_statement(&bucket)],
    )?;
    builder.grant_invoke(&function, &role)?;

    let mut props = DeliveryPipelineProps::new(bucket.clone(), role.clone());
    props.processing_stages.push(function.clone());
    props.error_log_group = Some(log_group.clone());
    props.compression = Compression::Gzip;
    let stream = builder.declare_delivery_pipeline("DeliveryStream", props)?;

    Ok(DeliveryHandles {
        log_group,
        bucket,
        function,
        role,
        stream,
    })
}

/// Panics unless every edge points backwards in the plan
pub fn assert_respects_dependencies(plan: &RealizationPlan) {
    for edge in plan.edges() {
        let from = plan.position(&edge.from).expect("edge source in plan");
        let to = plan.position(&edge.to).expect("edge target in plan");
        assert!(
            to < from,
            "`{}` (position {from}) must come after `{}` (position {to})",
            edge.from,
            edge.to
        );
    }
}

pub fn plan_order(plan: &RealizationPlan) -> Vec<String> {
    plan.steps()
        .iter()
        .map(|d| d.logical_id().to_string())
        .collect()
}
