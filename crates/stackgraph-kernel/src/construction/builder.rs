//! Graph Builder
//!
//! The primary interface for declaring a stack. Each declaration validates
//! its inputs, inserts one descriptor and wires its dependency edges.
//! `synthesize()` orders the graph and seals the builder.

use crate::construction::props::{DeliveryPipelineProps, FunctionProps};
use crate::construction::validator::DeclarationValidator;
use crate::dag::Dag;
use crate::descriptor::{PropertyValue, ResourceDescriptor, ResourceHandle};
use crate::error::StackError;
use crate::plan::{DependencyEdge, RealizationPlan};
use crate::types::{
    timeout_seconds, BlockPublicAccess, BuildState, LifecycleRule, ResourceType, RetentionDays,
    SourceType,
};
use indexmap::IndexMap;
use stackgraph_policy::{LogicalId, Pattern, PolicyDocument, PolicyStatement, Principal};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Log stream the delivery pipeline writes its errors to
pub const DELIVERY_ERROR_LOG_STREAM: &str = "S3Delivery";

/// Builder for a stack's resource graph
///
/// Usage:
/// ```rust
/// use stackgraph_kernel::prelude::*;
///
/// let mut builder = GraphBuilder::new("AwsCdkHandsonStack");
/// let logs = builder.declare_logging_sink("WebServerLogGroup", RetentionDays::OneYear)?;
/// let plan = builder.synthesize()?;
/// assert_eq!(plan.steps()[0].logical_id(), logs.logical_id());
/// # Ok::<(), StackError>(())
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    stack_name: String,
    state: BuildState,
    descriptors: IndexMap<LogicalId, ResourceDescriptor>,
    dag: Dag,
    invoke_grants: BTreeSet<(LogicalId, LogicalId)>,
}

impl GraphBuilder {
    /// Create a builder for `stack_name`
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            state: BuildState::Building,
            descriptors: IndexMap::new(),
            dag: Dag::new(),
            invoke_grants: BTreeSet::new(),
        }
    }

    /// Stack identity
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Building or sealed
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Number of declared descriptors
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.dag.edge_count()
    }

    /// Descriptor by id
    pub fn get(&self, id: &LogicalId) -> Option<&ResourceDescriptor> {
        self.descriptors.get(id)
    }

    /// Descriptors in declaration order
    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.values()
    }

    /// Ids `id` depends on
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<LogicalId> {
        self.dag.dependencies_of(id)
    }

    /// Grantees allowed to invoke `function`
    pub fn invokers_of(&self, function: &LogicalId) -> Vec<&LogicalId> {
        self.invoke_grants
            .iter()
            .filter(|(f, _)| f == function)
            .map(|(_, grantee)| grantee)
            .collect()
    }

    fn ensure_building(&self) -> Result<(), StackError> {
        match self.state {
            BuildState::Building => Ok(()),
            BuildState::Sealed => Err(StackError::Sealed(self.stack_name.clone())),
        }
    }

    /// Insert a fully formed descriptor
    ///
    /// The typed `declare_*` methods funnel through here. Checks run before
    /// any mutation, so a rejected descriptor leaves no trace.
    pub fn declare(&mut self, descriptor: ResourceDescriptor) -> Result<ResourceHandle, StackError> {
        self.ensure_building()?;

        let validator = DeclarationValidator::new(&self.descriptors);
        validator.check_identifier(descriptor.logical_id(), descriptor.resource_type())?;
        if let Some(policy) = descriptor.policy() {
            DeclarationValidator::check_policy(descriptor.logical_id(), policy)?;
        }
        validator.check_references(&descriptor)?;

        let id = descriptor.logical_id().clone();
        let dependencies = descriptor.dependencies();
        self.dag.add_node(id.clone());
        for dependency in &dependencies {
            // The new node has no dependents yet, so this cannot close a cycle
            self.dag.add_dependency(&id, dependency)?;
        }

        debug!(
            logical_id = %id,
            resource_type = %descriptor.resource_type(),
            dependencies = dependencies.len(),
            "declared resource"
        );

        let handle = ResourceHandle::named(descriptor.resource_type(), id.clone());
        self.descriptors.insert(id, descriptor);
        Ok(handle)
    }

    /// Declare a named log group
    pub fn declare_logging_sink(
        &mut self,
        name: &str,
        retention: RetentionDays,
    ) -> Result<ResourceHandle, StackError> {
        let mut descriptor =
            ResourceDescriptor::new(name, ResourceType::LogGroup).with_property("LogGroupName", name);
        if let Some(days) = retention.days() {
            descriptor.set_property("RetentionInDays", days);
        }
        self.declare(descriptor)
    }

    /// Declare a bucket
    pub fn declare_storage_sink(
        &mut self,
        name: &str,
        public_access: BlockPublicAccess,
        lifecycle_rules: Vec<LifecycleRule>,
    ) -> Result<ResourceHandle, StackError> {
        let mut descriptor =
            ResourceDescriptor::new(name, ResourceType::Bucket).with_property("BucketName", name);
        if let Some(block) = public_access.to_template() {
            descriptor.set_property(
                "PublicAccessBlockConfiguration",
                PropertyValue::from_json(block),
            );
        }
        if !lifecycle_rules.is_empty() {
            let rules = lifecycle_rules
                .iter()
                .map(|r| PropertyValue::from_json(r.to_template()))
                .collect::<Vec<_>>();
            descriptor.set_property(
                "LifecycleConfiguration",
                PropertyValue::map([("Rules", PropertyValue::List(rules))]),
            );
        }
        self.declare(descriptor)
    }

    /// Declare an assumable role with an inline policy
    pub fn declare_assumable_role(
        &mut self,
        name: &str,
        trusted_principal: Principal,
        inline_policies: Vec<PolicyStatement>,
    ) -> Result<ResourceHandle, StackError> {
        let descriptor = ResourceDescriptor::new(name, ResourceType::Role)
            .with_property("RoleName", name)
            .with_property(
                "AssumeRolePolicyDocument",
                PropertyValue::from_json(trusted_principal.assume_role_document()),
            )
            .with_policy(PolicyDocument::from_statements(inline_policies));
        self.declare(descriptor)
    }

    /// Declare a managed function
    pub fn declare_function(
        &mut self,
        name: &str,
        props: FunctionProps,
    ) -> Result<ResourceHandle, StackError> {
        let timeout = i64::try_from(timeout_seconds(props.timeout)).unwrap_or(i64::MAX);
        let mut descriptor = ResourceDescriptor::new(name, ResourceType::Function)
            .with_property("FunctionName", name)
            .with_property("Runtime", props.runtime.as_str())
            .with_property("Handler", props.handler)
            .with_property("Code", PropertyValue::from_json(props.code.to_template()))
            .with_property("Timeout", timeout)
            .with_property(
                "TracingConfig",
                PropertyValue::map([("Mode", PropertyValue::from(props.tracing.as_str()))]),
            )
            .with_policy(PolicyDocument::from_statements(props.initial_policy));
        if let Some(memory) = props.memory_size_mb {
            descriptor.set_property("MemorySize", memory);
        }
        if !props.environment.is_empty() {
            let variables = props
                .environment
                .into_iter()
                .map(|(k, v)| (k, PropertyValue::String(v)));
            descriptor.set_property(
                "Environment",
                PropertyValue::map([("Variables", PropertyValue::map(variables))]),
            );
        }
        self.declare(descriptor)
    }

    /// Allow `grantee` to invoke `function`
    ///
    /// Appends one allow-statement on the function ARN to the grantee's
    /// inline policy. Returns `false` when the grant already existed.
    pub fn grant_invoke(
        &mut self,
        function: &ResourceHandle,
        grantee: &ResourceHandle,
    ) -> Result<bool, StackError> {
        self.ensure_building()?;

        let grantee_id = grantee.logical_id().clone();
        let function_id = function.logical_id().clone();

        let validator = DeclarationValidator::new(&self.descriptors);
        validator.check_handle(&grantee_id, function, ResourceType::Function)?;
        let grantee_type = self
            .descriptors
            .get(&grantee_id)
            .map(ResourceDescriptor::resource_type)
            .ok_or_else(|| StackError::DanglingReference {
                referencer: function_id.clone(),
                missing: grantee_id.clone(),
            })?;
        if !grantee_type.carries_policy() {
            return Err(StackError::TypeMismatch {
                referencer: function_id,
                target: grantee_id,
                expected: ResourceType::Role,
                found: grantee_type,
            });
        }

        let grant = (function_id.clone(), grantee_id.clone());
        if self.invoke_grants.contains(&grant) {
            return Ok(false);
        }
        if self.dag.would_create_cycle(&grantee_id, &function_id) {
            return Err(StackError::CycleDetected(vec![grantee_id, function_id]));
        }

        self.dag.add_dependency(&grantee_id, &function_id)?;
        if let Some(descriptor) = self.descriptors.get_mut(&grantee_id) {
            descriptor.policy_mut().push_unique(invoke_statement(function));
        }
        self.invoke_grants.insert(grant);

        debug!(function = %function_id, grantee = %grantee_id, "granted invoke");
        Ok(true)
    }

    /// Declare a delivery pipeline
    pub fn declare_delivery_pipeline(
        &mut self,
        name: &str,
        props: DeliveryPipelineProps,
    ) -> Result<ResourceHandle, StackError> {
        self.ensure_building()?;

        let id = LogicalId::new(name);
        let validator = DeclarationValidator::new(&self.descriptors);
        validator.check_identifier(&id, ResourceType::DeliveryStream)?;
        DeclarationValidator::check_buffering(
            &id,
            props.buffer_interval_seconds,
            props.buffer_size_mb,
        )?;
        validator.check_handle(&id, &props.destination, ResourceType::Bucket)?;
        validator.check_handle(&id, &props.role, ResourceType::Role)?;
        for stage in &props.processing_stages {
            validator.check_handle(&id, stage, ResourceType::Function)?;
        }
        if let Some(log_group) = &props.error_log_group {
            validator.check_handle(&id, log_group, ResourceType::LogGroup)?;
        }

        let descriptor = delivery_pipeline_descriptor(name, &props);
        self.declare(descriptor)
    }

    /// Order the graph into a realization plan and seal the builder
    pub fn synthesize(&mut self) -> Result<RealizationPlan, StackError> {
        self.ensure_building()?;

        let order = self.dag.topological_sort()?;
        let mut steps = Vec::with_capacity(order.len());
        let mut edges = Vec::new();
        for id in &order {
            let descriptor = self
                .descriptors
                .get(id)
                .ok_or_else(|| StackError::DanglingReference {
                    referencer: LogicalId::new(self.stack_name.as_str()),
                    missing: id.clone(),
                })?;
            edges.extend(self.dag.dependencies_of(id).into_iter().map(|to| DependencyEdge {
                from: id.clone(),
                to,
            }));
            steps.push(descriptor.clone());
        }

        let plan = RealizationPlan::new(self.stack_name.clone(), steps, edges);
        self.state = BuildState::Sealed;

        info!(
            stack = %self.stack_name,
            resources = plan.len(),
            edges = plan.edges().len(),
            fingerprint = %plan.fingerprint_hex(),
            "synthesized realization plan"
        );
        Ok(plan)
    }
}

/// Allow-statement granting invocation of `function`
#[must_use]
pub fn invoke_statement(function: &ResourceHandle) -> PolicyStatement {
    PolicyStatement::allow()
        .actions(["lambda:InvokeFunction", "lambda:GetFunctionConfiguration"])
        .resource(function.arn())
        .resource(Pattern::attr(function.arn()).then_text(":*"))
}

fn delivery_pipeline_descriptor(name: &str, props: &DeliveryPipelineProps) -> ResourceDescriptor {
    let mut destination: Vec<(&str, PropertyValue)> = vec![
        ("BucketARN", props.destination.arn().into()),
        ("RoleARN", props.role.arn().into()),
        (
            "BufferingHints",
            PropertyValue::map([
                ("IntervalInSeconds", PropertyValue::from(props.buffer_interval_seconds)),
                ("SizeInMBs", PropertyValue::from(props.buffer_size_mb)),
            ]),
        ),
        ("CompressionFormat", props.compression.as_str().into()),
    ];
    if let Some(prefix) = &props.prefix {
        destination.push(("Prefix", prefix.as_str().into()));
    }
    if let Some(prefix) = &props.error_output_prefix {
        destination.push(("ErrorOutputPrefix", prefix.as_str().into()));
    }
    if let Some(log_group) = &props.error_log_group {
        destination.push((
            "CloudWatchLoggingOptions",
            PropertyValue::map([
                ("Enabled", PropertyValue::from(true)),
                ("LogGroupName", log_group.name().into()),
                ("LogStreamName", DELIVERY_ERROR_LOG_STREAM.into()),
            ]),
        ));
    }
    if !props.processing_stages.is_empty() {
        let processors = props
            .processing_stages
            .iter()
            .map(|stage| {
                PropertyValue::map([
                    ("Type", PropertyValue::from("Lambda")),
                    (
                        "Parameters",
                        PropertyValue::List(vec![PropertyValue::map([
                            ("ParameterName", PropertyValue::from("LambdaArn")),
                            ("ParameterValue", stage.arn().into()),
                        ])]),
                    ),
                ])
            })
            .collect::<Vec<_>>();
        destination.push((
            "ProcessingConfiguration",
            PropertyValue::map([
                ("Enabled", PropertyValue::from(true)),
                ("Processors", PropertyValue::List(processors)),
            ]),
        ));
    }

    let mut descriptor = ResourceDescriptor::new(name, ResourceType::DeliveryStream)
        .with_property("DeliveryStreamName", name)
        .with_property("DeliveryStreamType", props.source.as_str());
    if let SourceType::KinesisStream { stream_arn } = &props.source {
        descriptor.set_property(
            "KinesisStreamSourceConfiguration",
            PropertyValue::map([
                ("KinesisStreamARN", PropertyValue::from(stream_arn.as_str())),
                ("RoleARN", props.role.arn().into()),
            ]),
        );
    }
    descriptor.set_property(
        "ExtendedS3DestinationConfiguration",
        PropertyValue::map(destination),
    );
    descriptor
}
