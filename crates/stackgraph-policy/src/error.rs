//! Error types for policy construction

/// A single statement failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    /// The statement lists no resources
    #[error("resource list is empty")]
    EmptyResources,

    /// The statement lists no actions
    #[error("action list is empty")]
    EmptyActions,

    /// An action is not of the form `service:Action`
    #[error("malformed action `{0}`")]
    MalformedAction(String),
}

/// A policy document failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Statement at `index` is invalid
    #[error("statement {index}: {source}")]
    InvalidStatement {
        /// Position of the statement inside its document
        index: usize,
        /// What was wrong with it
        #[source]
        source: StatementError,
    },
}

impl PolicyError {
    /// Index of the offending statement
    #[must_use]
    pub fn statement_index(&self) -> usize {
        match self {
            Self::InvalidStatement { index, .. } => *index,
        }
    }

    /// Underlying statement error
    #[must_use]
    pub fn statement_error(&self) -> &StatementError {
        match self {
            Self::InvalidStatement { source, .. } => source,
        }
    }
}
