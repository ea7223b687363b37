//! Trusted principals for assumable roles

use crate::statement::POLICY_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Who may assume a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// A managed service, e.g. `firehose.amazonaws.com`
    Service(String),
    /// An account or identity ARN
    Aws(String),
}

impl Principal {
    /// Service principal shorthand
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }

    /// Render the `Principal` element of a trust statement
    #[must_use]
    pub fn to_template(&self) -> Value {
        match self {
            Self::Service(s) => json!({ "Service": s }),
            Self::Aws(a) => json!({ "AWS": a }),
        }
    }

    /// Trust policy allowing this principal to assume the role
    #[must_use]
    pub fn assume_role_document(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": "Allow",
                "Principal": self.to_template(),
                "Action": "sts:AssumeRole",
            }],
        })
    }
}
