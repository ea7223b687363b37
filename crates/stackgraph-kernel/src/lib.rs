//! Stackgraph Kernel (stackgraph-kernel)
//!
//! Declarative resource graph for a log delivery stack, in two phases:
//! 1. **Construction**: declare resources through [`GraphBuilder`], each
//!    checked and wired into the dependency graph as it arrives
//! 2. **Synthesis**: order the graph into a [`RealizationPlan`] and seal the
//!    builder
//!
//! # Quick Start
//!
//! ```rust
//! use stackgraph_kernel::prelude::*;
//!
//! let mut builder = GraphBuilder::new("LogStack");
//! let bucket = builder.declare_storage_sink("Backup", BlockPublicAccess::BlockAll, vec![])?;
//! let role = builder.declare_assumable_role(
//!     "DeliveryRole",
//!     Principal::service("firehose.amazonaws.com"),
//!     vec![PolicyStatement::allow().action("s3:PutObject").resource(bucket.arn())],
//! )?;
//!
//! let plan = builder.synthesize()?;
//! assert!(plan.position(bucket.logical_id()) < plan.position(role.logical_id()));
//! # Ok::<(), StackError>(())
//! ```

pub mod construction;
pub mod dag;
pub mod descriptor;
pub mod error;
pub mod plan;
pub mod template;
pub mod types;

pub use construction::GraphBuilder;
pub use descriptor::{PropertyValue, ResourceDescriptor, ResourceHandle};
pub use error::StackError;
pub use plan::{DependencyEdge, PlanStep, PlanSummary, RealizationPlan};
pub use types::*;

/// Everything needed to declare and synthesize a stack
pub mod prelude {
    pub use crate::construction::{DeliveryPipelineProps, FunctionProps, GraphBuilder};
    pub use crate::descriptor::{PropertyValue, ResourceDescriptor, ResourceHandle};
    pub use crate::error::StackError;
    pub use crate::plan::{DependencyEdge, RealizationPlan};
    pub use crate::types::{
        BlockPublicAccess, BuildState, CodeLocation, Compression, LifecycleRule, ResourceType,
        RetentionDays, Runtime, SourceType, TracingMode,
    };
    pub use stackgraph_policy::{
        Attribute, AttributeRef, Bindings, LogicalId, Pattern, PolicyDocument, PolicyStatement,
        Principal,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
