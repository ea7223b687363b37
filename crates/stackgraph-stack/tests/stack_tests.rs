use pretty_assertions::assert_eq;
use serde_json::json;
use stackgraph_kernel::prelude::*;
use stackgraph_stack::{
    bind_plan, build_log_delivery_stack, synthesize, StackConfig, SynthError, DEFAULT_STACK_NAME,
};
use stackgraph_test_utils::{assert_respects_dependencies, plan_order};

fn default_plan() -> RealizationPlan {
    synthesize(DEFAULT_STACK_NAME, &StackConfig::default()).unwrap()
}

#[test]
fn test_reference_stack_order() {
    let plan = default_plan();
    assert_respects_dependencies(&plan);
    assert_eq!(
        plan_order(&plan),
        vec![
            "WebServerLogGroup",
            "log-backup-bucket-20201201",
            "LogProcessor",
            "FirehoseDeliveryRole",
            "LogDeliveryStream"
        ]
    );
}

#[test]
fn test_reference_stack_handles() {
    let mut builder = GraphBuilder::new(DEFAULT_STACK_NAME);
    let stack = build_log_delivery_stack(&mut builder, &StackConfig::default()).unwrap();

    assert_eq!(stack.log_group.resource_type(), ResourceType::LogGroup);
    assert_eq!(stack.stream.resource_type(), ResourceType::DeliveryStream);
    assert_eq!(
        builder.invokers_of(stack.function.logical_id()),
        vec![stack.role.logical_id()]
    );
    // Role: bucket, log group, function. Stream: all four others.
    assert_eq!(builder.edge_count(), 7);
}

#[test]
fn test_log_group_retention_one_year() {
    let template = default_plan().to_template();
    assert_eq!(
        template["Resources"]["WebServerLogGroup"]["Properties"]["RetentionInDays"],
        365
    );
}

#[test]
fn test_deferred_tokens_reported() {
    let tokens: Vec<_> = default_plan().unresolved_tokens().into_iter().collect();
    assert_eq!(
        tokens,
        vec!["ACCOUNT_ID", "ASSETS_BUCKET", "KEY_ID", "REGION_NAME", "STREAM_NAME"]
    );
}

#[test]
fn test_bind_plan_substitutes_stream_arn() {
    let bindings = Bindings::new()
        .with("REGION_NAME", "ap-northeast-1")
        .with("ACCOUNT_ID", "123456789012")
        .with("STREAM_NAME", "web-logs");
    let bound = bind_plan(&default_plan(), &bindings, false).unwrap();

    let template = bound.to_template();
    assert_eq!(
        template["Resources"]["LogDeliveryStream"]["Properties"]
            ["KinesisStreamSourceConfiguration"]["KinesisStreamARN"],
        "arn:aws:kinesis:ap-northeast-1:123456789012:stream/web-logs"
    );
    let remaining: Vec<_> = bound.unresolved_tokens().into_iter().collect();
    assert_eq!(remaining, vec!["ASSETS_BUCKET", "KEY_ID"]);
}

#[test]
fn test_require_bound_rejects_leftovers() {
    let bindings = Bindings::new().with("REGION_NAME", "ap-northeast-1");
    match bind_plan(&default_plan(), &bindings, true) {
        Err(SynthError::Unbound(tokens)) => {
            assert_eq!(tokens, vec!["ACCOUNT_ID", "ASSETS_BUCKET", "KEY_ID", "STREAM_NAME"]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_direct_put_without_key_drops_statements() {
    let mut config = StackConfig::default();
    config.pipeline.source = SourceType::DirectPut;
    config.pipeline.kms_key_arn = None;
    let template = synthesize("Stack", &config).unwrap().to_template();

    let statements = template["Resources"]["FirehoseDeliveryRole"]["Properties"]["Policies"][0]
        ["PolicyDocument"]["Statement"]
        .as_array()
        .unwrap()
        .clone();
    // s3, logs, lambda invoke
    assert_eq!(statements.len(), 3);
    assert!(template["Resources"]["LogDeliveryStream"]["Properties"]
        .get("KinesisStreamSourceConfiguration")
        .is_none());
    assert_eq!(
        template["Resources"]["LogDeliveryStream"]["Properties"]["DeliveryStreamType"],
        "DirectPut"
    );
}

#[test]
fn test_zero_buffer_interval_surfaces_stack_error() {
    let mut config = StackConfig::default();
    config.pipeline.buffer_interval_seconds = 0;
    match synthesize("Stack", &config) {
        Err(SynthError::Stack(err)) => assert_eq!(err.kind(), "invalid_buffering_parameter"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_colliding_names_are_duplicates() {
    let mut config = StackConfig::default();
    config.function.name = config.log_group.name.clone();
    match synthesize("Stack", &config) {
        Err(SynthError::Stack(StackError::DuplicateIdentifier(id))) => {
            assert_eq!(id.as_str(), "WebServerLogGroup");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_role_cannot_take_function_execution_role_name() {
    let mut config = StackConfig::default();
    config.pipeline.role_name = format!("{}ServiceRole", config.function.name);
    match synthesize("Stack", &config) {
        Err(SynthError::Stack(StackError::DuplicateIdentifier(id))) => {
            assert_eq!(id.as_str(), "LogProcessorServiceRole");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_logs_statement_joins_log_group_name() {
    let template = default_plan().to_template();
    let statements = &template["Resources"]["FirehoseDeliveryRole"]["Properties"]["Policies"][0]
        ["PolicyDocument"]["Statement"];
    let logs = statements
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["Action"] == json!(["logs:PutLogEvents"]))
        .unwrap();
    assert_eq!(
        logs["Resource"],
        json!([{
            "Fn::Join": ["", [
                "arn:aws:logs:%REGION_NAME%:%ACCOUNT_ID%:log-group:",
                { "Ref": "WebServerLogGroup" },
                ":log-stream:*"
            ]]
        }])
    );
}

#[test]
fn test_fingerprint_depends_on_stack_name() {
    let a = synthesize("A", &StackConfig::default()).unwrap();
    let b = synthesize("B", &StackConfig::default()).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint(), synthesize("A", &StackConfig::default()).unwrap().fingerprint());
}
