//! Property bundles for the larger declarations

use crate::descriptor::ResourceHandle;
use crate::types::{CodeLocation, Compression, Runtime, SourceType, TracingMode};
use stackgraph_policy::PolicyStatement;
use std::collections::BTreeMap;
use std::time::Duration;

/// Inputs to [`GraphBuilder::declare_function`](crate::construction::GraphBuilder::declare_function)
#[derive(Debug, Clone)]
pub struct FunctionProps {
    /// Execution environment
    pub runtime: Runtime,
    /// Bundled code
    pub code: CodeLocation,
    /// Entry point, e.g. `index.handler`
    pub handler: String,
    /// Execution timeout
    pub timeout: Duration,
    /// Memory in MB; `None` keeps the service default
    pub memory_size_mb: Option<u32>,
    /// Tracing mode
    pub tracing: TracingMode,
    /// Environment variables
    pub environment: BTreeMap<String, String>,
    /// Statements for the function's own execution policy
    pub initial_policy: Vec<PolicyStatement>,
}

impl FunctionProps {
    /// Minimal props; everything else at defaults
    pub fn new(runtime: Runtime, code: CodeLocation, handler: impl Into<String>) -> Self {
        Self {
            runtime,
            code,
            handler: handler.into(),
            timeout: Duration::from_secs(3),
            memory_size_mb: None,
            tracing: TracingMode::PassThrough,
            environment: BTreeMap::new(),
            initial_policy: Vec::new(),
        }
    }
}

/// Inputs to [`GraphBuilder::declare_delivery_pipeline`](crate::construction::GraphBuilder::declare_delivery_pipeline)
#[derive(Debug, Clone)]
pub struct DeliveryPipelineProps {
    /// Where records come from
    pub source: SourceType,
    /// Destination bucket
    pub destination: ResourceHandle,
    /// Role the pipeline assumes
    pub role: ResourceHandle,
    /// Flush after this many seconds
    pub buffer_interval_seconds: u32,
    /// Flush after this many MB
    pub buffer_size_mb: u32,
    /// Object compression
    pub compression: Compression,
    /// Key prefix for delivered objects
    pub prefix: Option<String>,
    /// Key prefix for failed records
    pub error_output_prefix: Option<String>,
    /// Functions applied to records, in order
    pub processing_stages: Vec<ResourceHandle>,
    /// Log group receiving delivery errors
    pub error_log_group: Option<ResourceHandle>,
}

impl DeliveryPipelineProps {
    /// Direct-put pipeline into `destination` with service-default buffering
    #[must_use]
    pub fn new(destination: ResourceHandle, role: ResourceHandle) -> Self {
        Self {
            source: SourceType::DirectPut,
            destination,
            role,
            buffer_interval_seconds: 300,
            buffer_size_mb: 5,
            compression: Compression::Uncompressed,
            prefix: None,
            error_output_prefix: None,
            processing_stages: Vec::new(),
            error_log_group: None,
        }
    }
}
