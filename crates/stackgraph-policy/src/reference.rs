//! Symbolic references to derived attributes
//!
//! A derived attribute (an ARN, a physical name) is only known after the
//! deployment engine has realized the resource. Until then it is carried as
//! an [`AttributeRef`], and every reference implies a dependency edge.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Stack-unique identifier of a resource descriptor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Wrap an identifier without checking it
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ASCII alphanumerics plus `-` and `_`, with at least one alphanumeric
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().any(|c| c.is_ascii_alphanumeric())
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Key naming this descriptor inside a rendered template
    ///
    /// Templates only accept alphanumeric resource keys, so `-` and `_` are
    /// dropped. Two ids with the same key cannot coexist in one stack.
    #[must_use]
    pub fn template_key(&self) -> String {
        self.0.chars().filter(char::is_ascii_alphanumeric).collect()
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LogicalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Attributes a realized resource exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Fully qualified resource name
    Arn,
    /// Physical name assigned at realization
    Name,
}

impl Attribute {
    /// Attribute name as the template language spells it
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arn => "Arn",
            Self::Name => "Name",
        }
    }
}

/// Reference to one attribute of one descriptor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    /// Descriptor being referenced
    pub logical_id: LogicalId,
    /// Which of its attributes
    pub attribute: Attribute,
}

impl AttributeRef {
    /// Create a reference
    pub fn new(logical_id: impl Into<LogicalId>, attribute: Attribute) -> Self {
        Self {
            logical_id: logical_id.into(),
            attribute,
        }
    }

    /// Render as a template intrinsic (`Ref` for names, `Fn::GetAtt` otherwise)
    #[must_use]
    pub fn to_template(&self) -> Value {
        match self.attribute {
            Attribute::Name => json!({ "Ref": self.logical_id.template_key() }),
            Attribute::Arn => json!({ "Fn::GetAtt": [self.logical_id.template_key(), "Arn"] }),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.logical_id, self.attribute.as_str())
    }
}
