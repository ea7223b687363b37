use pretty_assertions::assert_eq;
use stackgraph_kernel::prelude::*;
use stackgraph_kernel::{construction::invoke_statement, PropertyValue};
use stackgraph_policy::StatementError;
use stackgraph_test_utils::{
    assert_respects_dependencies, bucket_statement, declare_delivery_graph, firehose_principal,
    function_props, plan_order, BACKUP_BUCKET, LOG_GROUP,
};

#[test]
fn test_web_server_log_group() {
    let mut builder = GraphBuilder::new("AwsCdkHandsonStack");
    let logs = builder
        .declare_logging_sink(LOG_GROUP, RetentionDays::OneYear)
        .unwrap();

    let descriptor = builder.get(logs.logical_id()).unwrap();
    assert_eq!(descriptor.resource_type(), ResourceType::LogGroup);
    assert_eq!(
        descriptor.property("RetentionInDays"),
        Some(&PropertyValue::Number(365))
    );
    assert_eq!(
        descriptor.property("LogGroupName"),
        Some(&PropertyValue::String(LOG_GROUP.into()))
    );
    assert!(descriptor.dependencies().is_empty());
    assert_eq!(builder.edge_count(), 0);
}

#[test]
fn test_bucket_realized_before_role() {
    let mut builder = GraphBuilder::new("AwsCdkHandsonStack");
    let bucket = builder
        .declare_storage_sink(BACKUP_BUCKET, BlockPublicAccess::BlockAll, vec![])
        .unwrap();
    let role = builder
        .declare_assumable_role(
            "FirehoseRole",
            firehose_principal(),
            vec![bucket_statement(&bucket)],
        )
        .unwrap();

    // The statement references the bucket twice but yields a single edge
    assert_eq!(builder.edge_count(), 1);

    let plan = builder.synthesize().unwrap();
    assert_eq!(plan_order(&plan), vec![BACKUP_BUCKET, "FirehoseRole"]);
    assert!(plan.position(bucket.logical_id()) < plan.position(role.logical_id()));
    assert_eq!(
        plan.edges(),
        &[DependencyEdge {
            from: LogicalId::new("FirehoseRole"),
            to: LogicalId::new(BACKUP_BUCKET),
        }]
    );
}

#[test]
fn test_duplicate_identifier_leaves_graph_unchanged() {
    let mut builder = GraphBuilder::new("Stack");
    builder
        .declare_logging_sink("Logs", RetentionDays::OneWeek)
        .unwrap();
    let before = builder.get(&LogicalId::new("Logs")).cloned();

    let err = builder
        .declare_storage_sink("Logs", BlockPublicAccess::BlockAll, vec![])
        .unwrap_err();

    assert_eq!(err, StackError::DuplicateIdentifier(LogicalId::new("Logs")));
    assert_eq!(builder.descriptor_count(), 1);
    assert_eq!(builder.get(&LogicalId::new("Logs")).cloned(), before);
}

#[test]
fn test_pipeline_with_undeclared_function_is_dangling() {
    let mut builder = GraphBuilder::new("Stack");
    let bucket = builder
        .declare_storage_sink("Bucket", BlockPublicAccess::BlockAll, vec![])
        .unwrap();
    let role = builder
        .declare_assumable_role("Role", firehose_principal(), vec![bucket_statement(&bucket)])
        .unwrap();

    let mut props = DeliveryPipelineProps::new(bucket, role);
    props
        .processing_stages
        .push(ResourceHandle::named(ResourceType::Function, "Processor"));

    let err = builder.declare_delivery_pipeline("Stream", props).unwrap_err();
    assert_eq!(
        err,
        StackError::DanglingReference {
            referencer: LogicalId::new("Stream"),
            missing: LogicalId::new("Processor"),
        }
    );
    assert_eq!(builder.descriptor_count(), 2);
}

#[test]
fn test_pipeline_with_non_bucket_destination_is_type_mismatch() {
    let mut builder = GraphBuilder::new("Stack");
    let logs = builder
        .declare_logging_sink("Logs", RetentionDays::OneWeek)
        .unwrap();
    let role = builder
        .declare_assumable_role("Role", firehose_principal(), vec![])
        .unwrap();

    let err = builder
        .declare_delivery_pipeline("Stream", DeliveryPipelineProps::new(logs, role))
        .unwrap_err();
    assert!(matches!(
        err,
        StackError::TypeMismatch {
            expected: ResourceType::Bucket,
            found: ResourceType::LogGroup,
            ..
        }
    ));
}

#[test]
fn test_role_with_empty_resources_rejected() {
    let mut builder = GraphBuilder::new("Stack");
    let err = builder
        .declare_assumable_role(
            "Role",
            firehose_principal(),
            vec![PolicyStatement::allow().action("s3:PutObject")],
        )
        .unwrap_err();

    match err {
        StackError::InvalidPolicyStatement { logical_id, source } => {
            assert_eq!(logical_id, LogicalId::new("Role"));
            assert_eq!(source.statement_index(), 0);
            assert_eq!(source.statement_error(), &StatementError::EmptyResources);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(builder.descriptor_count(), 0);
}

#[test]
fn test_role_with_malformed_action_rejected() {
    let mut builder = GraphBuilder::new("Stack");
    let bucket = builder
        .declare_storage_sink("Bucket", BlockPublicAccess::BlockAll, vec![])
        .unwrap();
    let err = builder
        .declare_assumable_role(
            "Role",
            firehose_principal(),
            vec![PolicyStatement::allow()
                .action("PutObject")
                .resource(bucket.arn())],
        )
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_policy_statement");
}

#[test]
fn test_zero_buffer_size_rejected() {
    let mut builder = GraphBuilder::new("Stack");
    let bucket = builder
        .declare_storage_sink("Bucket", BlockPublicAccess::BlockAll, vec![])
        .unwrap();
    let role = builder
        .declare_assumable_role("Role", firehose_principal(), vec![])
        .unwrap();

    let mut props = DeliveryPipelineProps::new(bucket, role);
    props.buffer_size_mb = 0;
    let err = builder.declare_delivery_pipeline("Stream", props).unwrap_err();
    assert_eq!(
        err,
        StackError::InvalidBufferingParameter {
            logical_id: LogicalId::new("Stream"),
            parameter: "buffer_size_mb",
        }
    );
}

#[test]
fn test_grant_invoke_is_idempotent() {
    let mut builder = GraphBuilder::new("Stack");
    let function = builder.declare_function("Processor", function_props()).unwrap();
    let role = builder
        .declare_assumable_role("Role", firehose_principal(), vec![])
        .unwrap();

    assert!(builder.grant_invoke(&function, &role).unwrap());
    assert!(!builder.grant_invoke(&function, &role).unwrap());

    let policy = builder.get(role.logical_id()).unwrap().policy().unwrap();
    assert_eq!(policy.len(), 1);
    assert_eq!(policy.statements()[0], invoke_statement(&function));
    assert_eq!(builder.edge_count(), 1);
    assert_eq!(builder.invokers_of(function.logical_id()), vec![role.logical_id()]);
}

#[test]
fn test_grant_invoke_on_undeclared_function_is_dangling() {
    let mut builder = GraphBuilder::new("Stack");
    let role = builder
        .declare_assumable_role("Role", firehose_principal(), vec![])
        .unwrap();
    let ghost = ResourceHandle::named(ResourceType::Function, "Ghost");

    assert!(matches!(
        builder.grant_invoke(&ghost, &role),
        Err(StackError::DanglingReference { .. })
    ));
    assert!(builder.get(role.logical_id()).unwrap().policy().unwrap().is_empty());
}

#[test]
fn test_full_delivery_graph_order() {
    let mut builder = GraphBuilder::new("Stack");
    let handles = declare_delivery_graph(&mut builder).unwrap();
    let plan = builder.synthesize().unwrap();

    assert_respects_dependencies(&plan);
    assert_eq!(plan.len(), 5);
    assert_eq!(plan.steps().last().unwrap().logical_id(), handles.stream.logical_id());
    assert!(plan.position(handles.function.logical_id()) < plan.position(handles.role.logical_id()));
    // Asset code waits on the deployment engine's asset bucket
    assert_eq!(
        plan.unresolved_tokens().into_iter().collect::<Vec<_>>(),
        vec!["ASSETS_BUCKET"]
    );
    assert_eq!(builder.state(), BuildState::Sealed);
}

#[test]
fn test_invalid_identifier_rejected() {
    let mut builder = GraphBuilder::new("Stack");
    assert_eq!(
        builder.declare_logging_sink("bad id", RetentionDays::OneDay),
        Err(StackError::InvalidIdentifier(LogicalId::new("bad id")))
    );
}

#[test]
fn test_role_named_after_function_execution_role_is_duplicate() {
    let mut builder = GraphBuilder::new("Stack");
    builder.declare_function("Fn", function_props()).unwrap();

    let err = builder
        .declare_assumable_role("FnServiceRole", firehose_principal(), vec![])
        .unwrap_err();

    assert_eq!(err, StackError::DuplicateIdentifier(LogicalId::new("FnServiceRole")));
    assert_eq!(builder.descriptor_count(), 1);
}

#[test]
fn test_function_whose_execution_role_is_taken_is_duplicate() {
    let mut builder = GraphBuilder::new("Stack");
    builder
        .declare_assumable_role("FnServiceRole", firehose_principal(), vec![])
        .unwrap();

    let err = builder.declare_function("Fn", function_props()).unwrap_err();

    assert_eq!(err, StackError::DuplicateIdentifier(LogicalId::new("Fn")));
    assert_eq!(builder.descriptor_count(), 1);
    assert!(builder.get(&LogicalId::new("Fn")).is_none());
}

#[test]
fn test_ids_differing_only_in_separators_are_duplicates() {
    let mut builder = GraphBuilder::new("Stack");
    builder
        .declare_storage_sink("log-bucket", BlockPublicAccess::BlockAll, vec![])
        .unwrap();

    assert_eq!(
        builder.declare_logging_sink("log_bucket", RetentionDays::OneDay),
        Err(StackError::DuplicateIdentifier(LogicalId::new("log_bucket")))
    );
    assert_eq!(builder.descriptor_count(), 1);
}
