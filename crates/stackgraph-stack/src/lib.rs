//! Stackgraph Stack (stackgraph-stack)
//!
//! The log delivery stack, composed on top of the kernel's graph builder:
//! a log group, a backup bucket, a processing function, a delivery role and
//! the delivery pipeline tying them together.
//!
//! # Quick Start
//!
//! ```rust
//! use stackgraph_stack::{synthesize, StackConfig, DEFAULT_STACK_NAME};
//!
//! let plan = synthesize(DEFAULT_STACK_NAME, &StackConfig::default())?;
//! assert_eq!(plan.len(), 5);
//! # Ok::<(), stackgraph_stack::SynthError>(())
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod stack;

pub use config::{
    BucketConfig, FunctionConfig, LogGroupConfig, PipelineConfig, StackConfig, DEFAULT_STACK_NAME,
};
pub use error::{ConfigError, SynthError};
pub use output::OutputFormat;
pub use stack::{
    bind_plan, build_log_delivery_stack, delivery_role_statements, synthesize, LogDeliveryStack,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
