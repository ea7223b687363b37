//! Resource descriptors and property values
//!
//! A descriptor is the in-memory declaration of a resource, not the
//! resource itself. Its property values may refer to derived attributes of
//! other descriptors; every such reference is a dependency edge.

use crate::types::ResourceType;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use stackgraph_policy::{Attribute, AttributeRef, Bindings, LogicalId, Pattern, PolicyDocument};
use std::collections::{BTreeMap, BTreeSet};

/// A property value: a literal or a reference-bearing pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// JSON `null`
    Null,
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Number(i64),
    /// String literal, possibly holding `%TOKEN%` placeholders
    String(String),
    /// Ordered list
    List(Vec<PropertyValue>),
    /// Key-sorted map
    Map(BTreeMap<String, PropertyValue>),
    /// Text joined with derived attributes at deployment time
    Pattern(Pattern),
}

impl PropertyValue {
    /// Build a map value from `(key, value)` pairs
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyValue)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert a plain JSON value (no references)
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::String(n.to_string()), Self::Number),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a AttributeRef>) {
        match self {
            Self::Pattern(p) => out.extend(p.references()),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_references(out)),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    fn collect_tokens(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::String(s) => out.extend(stackgraph_policy::tokens_in(s).map(str::to_string)),
            Self::Pattern(p) => out.extend(p.tokens()),
            Self::List(items) => items.iter().for_each(|v| v.collect_tokens(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_tokens(out)),
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
    }

    /// Copy with bound tokens substituted
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        match self {
            Self::String(s) => Self::String(bindings.apply(s).into_owned()),
            Self::Pattern(p) => Self::Pattern(p.bind(bindings)),
            Self::List(items) => Self::List(items.iter().map(|v| v.bind(bindings)).collect()),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.bind(bindings)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Render as a template value
    #[must_use]
    pub fn to_template(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::from(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_template).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_template()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Pattern(p) => p.to_template(),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<AttributeRef> for PropertyValue {
    fn from(value: AttributeRef) -> Self {
        Self::Pattern(Pattern::attr(value))
    }
}

impl From<Pattern> for PropertyValue {
    fn from(value: Pattern) -> Self {
        Self::Pattern(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}

/// Declarative representation of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    logical_id: LogicalId,
    resource_type: ResourceType,
    properties: IndexMap<String, PropertyValue>,
    policy: Option<PolicyDocument>,
}

impl ResourceDescriptor {
    /// Descriptor with no properties
    pub fn new(logical_id: impl Into<LogicalId>, resource_type: ResourceType) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type,
            properties: IndexMap::new(),
            policy: None,
        }
    }

    /// Builder form of [`ResourceDescriptor::set_property`]
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Attach an inline policy
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyDocument) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set (or replace) a property
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Stack-unique id
    #[must_use]
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Resource kind
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Properties in declaration order
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.properties
    }

    /// One property
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Inline policy, for roles and functions
    #[must_use]
    pub fn policy(&self) -> Option<&PolicyDocument> {
        self.policy.as_ref()
    }

    pub(crate) fn policy_mut(&mut self) -> &mut PolicyDocument {
        self.policy.get_or_insert_with(PolicyDocument::new)
    }

    /// Every derived-attribute reference in properties and policy
    #[must_use]
    pub fn references(&self) -> Vec<&AttributeRef> {
        let mut out = Vec::new();
        for value in self.properties.values() {
            value.collect_references(&mut out);
        }
        if let Some(policy) = &self.policy {
            out.extend(policy.references());
        }
        out
    }

    /// Distinct descriptors this one depends on
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<LogicalId> {
        self.references()
            .into_iter()
            .map(|r| r.logical_id.clone())
            .filter(|id| id != &self.logical_id)
            .collect()
    }

    /// Unresolved placeholder tokens
    #[must_use]
    pub fn tokens(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for value in self.properties.values() {
            value.collect_tokens(&mut out);
        }
        if let Some(policy) = &self.policy {
            out.extend(policy.tokens());
        }
        out
    }

    /// Copy with bound tokens substituted
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        Self {
            logical_id: self.logical_id.clone(),
            resource_type: self.resource_type,
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.bind(bindings)))
                .collect(),
            policy: self.policy.as_ref().map(|p| p.bind(bindings)),
        }
    }
}

/// Handle to a declared (or expected) descriptor
///
/// Declarations return handles; later declarations use them to reference
/// derived attributes. [`ResourceHandle::named`] builds a handle by id alone,
/// which the builder rejects as dangling unless the id has been declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle {
    logical_id: LogicalId,
    resource_type: ResourceType,
}

impl ResourceHandle {
    /// Handle to `logical_id`, claimed to be of `resource_type`
    pub fn named(resource_type: ResourceType, logical_id: impl Into<LogicalId>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type,
        }
    }

    /// Referenced id
    #[must_use]
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Claimed kind
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Derived `Arn` attribute (bucket ARN, role ARN, function ARN, ...)
    #[must_use]
    pub fn arn(&self) -> AttributeRef {
        AttributeRef::new(self.logical_id.clone(), Attribute::Arn)
    }

    /// Derived physical name
    #[must_use]
    pub fn name(&self) -> AttributeRef {
        AttributeRef::new(self.logical_id.clone(), Attribute::Name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stackgraph_policy::PolicyStatement;

    #[test]
    fn test_dependencies_are_distinct_and_skip_self() {
        let bucket = ResourceHandle::named(ResourceType::Bucket, "Bucket");
        let role = ResourceDescriptor::new("Role", ResourceType::Role)
            .with_property("Self", AttributeRef::new("Role", Attribute::Arn))
            .with_policy(PolicyDocument::from_statements(vec![PolicyStatement::allow()
                .action("s3:PutObject")
                .resource(bucket.arn())
                .resource(Pattern::attr(bucket.arn()).then_text("/*"))]));

        assert_eq!(role.references().len(), 3);
        let deps: Vec<_> = role.dependencies().into_iter().collect();
        assert_eq!(deps, vec![LogicalId::new("Bucket")]);
    }

    #[test]
    fn test_nested_values_render() {
        let value = PropertyValue::map([
            ("Enabled", PropertyValue::from(true)),
            ("Arn", PropertyValue::from(AttributeRef::new("Fn", Attribute::Arn))),
        ]);
        assert_eq!(
            value.to_template(),
            json!({ "Enabled": true, "Arn": { "Fn::GetAtt": ["Fn", "Arn"] } })
        );
    }

    #[test]
    fn test_tokens_in_plain_strings() {
        let d = ResourceDescriptor::new("Stream", ResourceType::DeliveryStream)
            .with_property("Source", "arn:aws:kinesis:%REGION_NAME%:%ACCOUNT_ID%:stream/x");
        assert_eq!(d.tokens().len(), 2);
        let bound = d.bind(&Bindings::new().with("REGION_NAME", "us-east-1"));
        assert_eq!(bound.tokens().len(), 1);
    }

    #[test]
    fn test_from_json_keeps_shape() {
        let v = json!({ "a": [1, "x", null], "b": false });
        assert_eq!(PropertyValue::from_json(v.clone()).to_template(), v);
    }
}
