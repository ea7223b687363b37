//! Realization Plan
//!
//! The ordered output of synthesis. Each descriptor appears after every
//! descriptor it references. The plan carries a SHA-256 fingerprint over its
//! template rendering, so identical graphs always fingerprint identically.

use crate::descriptor::ResourceDescriptor;
use crate::template;
use crate::types::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use stackgraph_policy::{Bindings, LogicalId};
use std::collections::BTreeSet;

/// `from` references a derived attribute of `to`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Referencing descriptor
    pub from: LogicalId,
    /// Referenced descriptor
    pub to: LogicalId,
}

/// Topologically ordered descriptors plus their edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizationPlan {
    stack_name: String,
    steps: Vec<ResourceDescriptor>,
    edges: Vec<DependencyEdge>,
    fingerprint: [u8; 32],
}

/// One line of a [`PlanSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Zero-based realization position
    pub position: usize,
    /// Descriptor realized at this step
    pub logical_id: LogicalId,
    /// Its resource kind
    pub resource_type: ResourceType,
    /// Ids this step references
    pub depends_on: Vec<LogicalId>,
}

/// Serializable overview of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Stack identity
    pub stack: String,
    /// Hex SHA-256
    pub fingerprint: String,
    /// Steps in realization order
    pub steps: Vec<PlanStep>,
    /// Placeholder tokens still awaiting a binding
    pub unresolved_tokens: BTreeSet<String>,
}

impl RealizationPlan {
    pub(crate) fn new(
        stack_name: String,
        steps: Vec<ResourceDescriptor>,
        edges: Vec<DependencyEdge>,
    ) -> Self {
        let fingerprint = compute_fingerprint(&stack_name, &template::render(&stack_name, &steps, &edges));
        Self {
            stack_name,
            steps,
            edges,
            fingerprint,
        }
    }

    /// Stack identity
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Descriptors in realization order
    #[must_use]
    pub fn steps(&self) -> &[ResourceDescriptor] {
        &self.steps
    }

    /// Dependency edges, grouped by referencing descriptor in plan order
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Number of descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for an empty stack
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Position of `id` in the realization order
    #[must_use]
    pub fn position(&self, id: &LogicalId) -> Option<usize> {
        self.steps.iter().position(|d| d.logical_id() == id)
    }

    /// Descriptor by id
    #[must_use]
    pub fn get(&self, id: &LogicalId) -> Option<&ResourceDescriptor> {
        self.steps.iter().find(|d| d.logical_id() == id)
    }

    /// Ids `id` depends on
    pub fn dependencies_of<'a>(&'a self, id: &'a LogicalId) -> impl Iterator<Item = &'a LogicalId> {
        self.edges.iter().filter(move |e| &e.from == id).map(|e| &e.to)
    }

    /// SHA-256 over the stack name and template rendering
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Hex form of [`RealizationPlan::fingerprint`]
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }

    /// Placeholder tokens still awaiting a binding
    #[must_use]
    pub fn unresolved_tokens(&self) -> BTreeSet<String> {
        self.steps.iter().flat_map(ResourceDescriptor::tokens).collect()
    }

    /// Copy with bound tokens substituted; order and edges are unchanged
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        let steps = self.steps.iter().map(|d| d.bind(bindings)).collect();
        Self::new(self.stack_name.clone(), steps, self.edges.clone())
    }

    /// Deployment template rendering
    #[must_use]
    pub fn to_template(&self) -> Value {
        template::render(&self.stack_name, &self.steps, &self.edges)
    }

    /// Serializable overview
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(position, d)| PlanStep {
                position,
                logical_id: d.logical_id().clone(),
                resource_type: d.resource_type(),
                depends_on: self.dependencies_of(d.logical_id()).cloned().collect(),
            })
            .collect();
        PlanSummary {
            stack: self.stack_name.clone(),
            fingerprint: self.fingerprint_hex(),
            steps,
            unresolved_tokens: self.unresolved_tokens(),
        }
    }
}

fn compute_fingerprint(stack_name: &str, template: &Value) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(stack_name.as_bytes());
    hasher.update([0]);
    // serde_json maps are key-sorted, so the rendering is deterministic
    hasher.update(template.to_string().as_bytes());
    hasher.finalize().into()
}
