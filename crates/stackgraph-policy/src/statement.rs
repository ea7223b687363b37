//! Permission statements and policy documents

use crate::action::Action;
use crate::binding::Bindings;
use crate::error::{PolicyError, StatementError};
use crate::pattern::Pattern;
use crate::reference::AttributeRef;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Policy language version stamped on every document
pub const POLICY_VERSION: &str = "2012-10-17";

/// Condition operator → condition key → value
pub type ConditionMap = BTreeMap<String, BTreeMap<String, Pattern>>;

/// Whether a statement grants or denies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the listed actions
    Allow,
    /// Deny the listed actions
    Deny,
}

impl Effect {
    /// Effect keyword
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// One permission statement
///
/// Built fluently; actions keep insertion order and ignore duplicates.
///
/// ```rust
/// use stackgraph_policy::PolicyStatement;
///
/// let s = PolicyStatement::allow()
///     .actions(["kinesis:DescribeStream", "kinesis:GetRecords"])
///     .resource("arn:aws:kinesis:%REGION_NAME%:%ACCOUNT_ID%:stream/%STREAM_NAME%");
/// assert_eq!(s.tokens().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<Action>,
    resources: Vec<Pattern>,
    conditions: ConditionMap,
}

impl PolicyStatement {
    /// Empty statement with the given effect
    #[must_use]
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
            conditions: ConditionMap::new(),
        }
    }

    /// Empty allow-statement
    #[must_use]
    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    /// Empty deny-statement
    #[must_use]
    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    /// Attach a statement id
    #[must_use]
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Add one action
    #[must_use]
    pub fn action(mut self, action: impl Into<Action>) -> Self {
        let action = action.into();
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    /// Add several actions
    #[must_use]
    pub fn actions<I, A>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        actions.into_iter().fold(self, |s, a| s.action(a))
    }

    /// Add one resource pattern
    #[must_use]
    pub fn resource(mut self, resource: impl Into<Pattern>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Add a condition `operator: { key: value }`
    #[must_use]
    pub fn condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Pattern>,
    ) -> Self {
        self.conditions
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Statement id
    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Allow or deny
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions in insertion order
    #[must_use]
    pub fn action_list(&self) -> &[Action] {
        &self.actions
    }

    /// Resource patterns in insertion order
    #[must_use]
    pub fn resource_list(&self) -> &[Pattern] {
        &self.resources
    }

    /// Conditions
    #[must_use]
    pub fn conditions(&self) -> &ConditionMap {
        &self.conditions
    }

    /// Every reference in resources and condition values
    pub fn references(&self) -> impl Iterator<Item = &AttributeRef> {
        self.resources.iter().flat_map(|p| p.references()).chain(
            self.conditions
                .values()
                .flat_map(|entries| entries.values())
                .flat_map(|p| p.references()),
        )
    }

    /// Unresolved placeholder tokens
    #[must_use]
    pub fn tokens(&self) -> BTreeSet<String> {
        self.resources
            .iter()
            .chain(self.conditions.values().flat_map(|entries| entries.values()))
            .flat_map(Pattern::tokens)
            .collect()
    }

    /// Copy with bound tokens substituted
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        Self {
            sid: self.sid.clone(),
            effect: self.effect,
            actions: self.actions.clone(),
            resources: self.resources.iter().map(|p| p.bind(bindings)).collect(),
            conditions: self
                .conditions
                .iter()
                .map(|(op, entries)| {
                    let entries = entries
                        .iter()
                        .map(|(k, v)| (k.clone(), v.bind(bindings)))
                        .collect();
                    (op.clone(), entries)
                })
                .collect(),
        }
    }

    /// Check actions and resources
    pub fn validate(&self) -> Result<(), StatementError> {
        if self.actions.is_empty() {
            return Err(StatementError::EmptyActions);
        }
        if let Some(bad) = self.actions.iter().find(|a| !a.is_well_formed()) {
            return Err(StatementError::MalformedAction(bad.to_string()));
        }
        if self.resources.is_empty() || self.resources.iter().any(Pattern::is_empty) {
            return Err(StatementError::EmptyResources);
        }
        Ok(())
    }

    /// Render as a template statement
    #[must_use]
    pub fn to_template(&self) -> Value {
        let mut out = Map::new();
        if let Some(sid) = &self.sid {
            out.insert("Sid".into(), json!(sid));
        }
        out.insert("Effect".into(), json!(self.effect.as_str()));
        out.insert(
            "Action".into(),
            Value::Array(self.actions.iter().map(|a| json!(a.as_str())).collect()),
        );
        out.insert(
            "Resource".into(),
            Value::Array(self.resources.iter().map(Pattern::to_template).collect()),
        );
        if !self.conditions.is_empty() {
            let conditions: Map<String, Value> = self
                .conditions
                .iter()
                .map(|(op, entries)| {
                    let entries: Map<String, Value> = entries
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_template()))
                        .collect();
                    (op.clone(), Value::Object(entries))
                })
                .collect();
            out.insert("Condition".into(), Value::Object(conditions));
        }
        Value::Object(out)
    }
}

/// Ordered list of statements attached to one identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding `statements` as given (duplicates included)
    #[must_use]
    pub fn from_statements(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    /// Statements in order
    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True when there are no statements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// True if an identical statement is already present
    #[must_use]
    pub fn contains(&self, statement: &PolicyStatement) -> bool {
        self.statements.contains(statement)
    }

    /// Append unless an identical statement exists; returns whether it was added
    pub fn push_unique(&mut self, statement: PolicyStatement) -> bool {
        if self.contains(&statement) {
            return false;
        }
        self.statements.push(statement);
        true
    }

    /// Validate every statement, reporting the first failure by index
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (index, statement) in self.statements.iter().enumerate() {
            statement
                .validate()
                .map_err(|source| PolicyError::InvalidStatement { index, source })?;
        }
        Ok(())
    }

    /// Every reference made by any statement
    pub fn references(&self) -> impl Iterator<Item = &AttributeRef> {
        self.statements.iter().flat_map(|s| s.references())
    }

    /// Unresolved placeholder tokens across all statements
    #[must_use]
    pub fn tokens(&self) -> BTreeSet<String> {
        self.statements.iter().flat_map(PolicyStatement::tokens).collect()
    }

    /// Copy with bound tokens substituted
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        Self {
            statements: self.statements.iter().map(|s| s.bind(bindings)).collect(),
        }
    }

    /// Render as a template policy document
    #[must_use]
    pub fn to_template(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements.iter().map(PolicyStatement::to_template).collect::<Vec<_>>(),
        })
    }
}
