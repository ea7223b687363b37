//! Stackgraph Policy (stackgraph-policy)
//!
//! The value language shared by every resource declaration:
//! - **References**: symbolic handles to attributes that only exist once a
//!   resource has been realized (`Arn`, `Name`)
//! - **Patterns**: text and references joined at deployment time
//! - **Statements**: allow/deny permission statements and policy documents
//! - **Bindings**: `%TOKEN%` placeholders substituted by a later stage
//!
//! # Quick Start
//!
//! ```rust
//! use stackgraph_policy::{Attribute, AttributeRef, Pattern, PolicyStatement};
//!
//! let bucket = AttributeRef::new("LogBucket", Attribute::Arn);
//! let statement = PolicyStatement::allow()
//!     .action("s3:PutObject")
//!     .resource(bucket.clone())
//!     .resource(Pattern::attr(bucket).then_text("/*"));
//!
//! assert!(statement.validate().is_ok());
//! assert_eq!(statement.references().count(), 2);
//! ```

pub mod action;
pub mod binding;
pub mod error;
pub mod pattern;
pub mod principal;
pub mod reference;
pub mod statement;

pub use action::Action;
pub use binding::{is_token_name, tokens_in, Bindings, ENV_PREFIX};
pub use error::{PolicyError, StatementError};
pub use pattern::{Fragment, Pattern};
pub use principal::Principal;
pub use reference::{Attribute, AttributeRef, LogicalId};
pub use statement::{ConditionMap, Effect, PolicyDocument, PolicyStatement, POLICY_VERSION};
