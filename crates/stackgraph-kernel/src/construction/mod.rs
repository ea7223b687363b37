//! Construction Phase
//!
//! Declarations are validated and wired into the dependency graph here.
//! Nothing invalid ever enters the graph, so synthesis only has to order it.

pub mod builder;
pub mod props;
pub mod validator;

pub use builder::{invoke_statement, GraphBuilder, DELIVERY_ERROR_LOG_STREAM};
pub use props::{DeliveryPipelineProps, FunctionProps};
pub use validator::DeclarationValidator;
