//! Error types for graph construction and synthesis
//!
//! Every error is raised at the call that caused it and leaves the graph
//! exactly as it was before that call.

use crate::dag::DagError;
use crate::types::ResourceType;
use stackgraph_policy::{LogicalId, PolicyError};

/// Errors raised by the graph builder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// Logical id (or the template key it renders to) already taken
    #[error("logical id `{0}` collides with an already declared resource")]
    DuplicateIdentifier(LogicalId),

    /// A reference names a descriptor that is not in the graph
    #[error("`{referencer}` references undeclared descriptor `{missing}`")]
    DanglingReference {
        /// Descriptor holding the reference
        referencer: LogicalId,
        /// Id that could not be found
        missing: LogicalId,
    },

    /// A reference names a descriptor of the wrong kind
    #[error("`{referencer}` expects `{target}` to be a {expected}, found {found}")]
    TypeMismatch {
        /// Descriptor holding the reference
        referencer: LogicalId,
        /// Referenced id
        target: LogicalId,
        /// Kind the declaration requires
        expected: ResourceType,
        /// Kind actually declared
        found: ResourceType,
    },

    /// Empty resource list or malformed action string
    #[error("invalid policy on `{logical_id}`: {source}")]
    InvalidPolicyStatement {
        /// Declaration carrying the policy
        logical_id: LogicalId,
        /// Offending statement
        #[source]
        source: PolicyError,
    },

    /// Non-positive buffering interval or size
    #[error("invalid buffering on `{logical_id}`: {parameter} must be positive")]
    InvalidBufferingParameter {
        /// Pipeline being declared
        logical_id: LogicalId,
        /// `buffer_interval_seconds` or `buffer_size_mb`
        parameter: &'static str,
    },

    /// The dependency graph has (or would have) a cycle
    #[error("dependency cycle among {0:?}")]
    CycleDetected(Vec<LogicalId>),

    /// Logical id is empty or holds illegal characters
    #[error("logical id `{0}` is malformed")]
    InvalidIdentifier(LogicalId),

    /// Builder already synthesized
    #[error("stack `{0}` is sealed; no further declarations accepted")]
    Sealed(String),
}

impl StackError {
    /// Short machine-readable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier(_) => "duplicate_identifier",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidPolicyStatement { .. } => "invalid_policy_statement",
            Self::InvalidBufferingParameter { .. } => "invalid_buffering_parameter",
            Self::CycleDetected(_) => "cycle_detected",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::Sealed(_) => "sealed",
        }
    }
}

impl From<DagError> for StackError {
    fn from(value: DagError) -> Self {
        match value {
            DagError::SelfLoop(id) => StackError::CycleDetected(vec![id]),
            DagError::CycleDetected(ids) => StackError::CycleDetected(ids),
            DagError::NodeNotFound(id) => StackError::DanglingReference {
                referencer: id.clone(),
                missing: id,
            },
        }
    }
}
