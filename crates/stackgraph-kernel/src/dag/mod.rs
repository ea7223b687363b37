//! Dependency DAG over logical ids
//!
//! Edges point from a dependency to its dependent, so a topological order is
//! directly a realization order.

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use stackgraph_policy::LogicalId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Structural graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// A node may not depend on itself
    #[error("`{0}` cannot depend on itself")]
    SelfLoop(LogicalId),

    /// Edge endpoint not in the graph
    #[error("`{0}` is not in the graph")]
    NodeNotFound(LogicalId),

    /// The listed nodes form a cycle
    #[error("dependency cycle among {0:?}")]
    CycleDetected(Vec<LogicalId>),
}

/// Acyclic dependency graph keyed by logical id
#[derive(Debug, Default)]
pub struct Dag {
    graph: DiGraph<LogicalId, ()>,
    index: HashMap<LogicalId, NodeIndex>,
}

impl Dag {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; inserting an existing id is a no-op
    pub fn add_node(&mut self, id: LogicalId) -> NodeIndex {
        if let Some(idx) = self.index.get(&id) {
            return *idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.index.insert(id, idx);
        idx
    }

    /// True if `id` is a node
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn lookup(&self, id: &LogicalId) -> Result<NodeIndex, DagError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DagError::NodeNotFound(id.clone()))
    }

    /// Record that `dependent` must be realized after `dependency`
    ///
    /// Rejects the edge (leaving the graph untouched) if it would close a
    /// cycle. Repeated edges collapse into one.
    pub fn add_dependency(
        &mut self,
        dependent: &LogicalId,
        dependency: &LogicalId,
    ) -> Result<(), DagError> {
        if dependent == dependency {
            return Err(DagError::SelfLoop(dependent.clone()));
        }
        let from = self.lookup(dependency)?;
        let to = self.lookup(dependent)?;

        if has_path_connecting(&self.graph, to, from, None) {
            return Err(DagError::CycleDetected(vec![
                dependent.clone(),
                dependency.clone(),
            ]));
        }

        self.graph.update_edge(from, to, ());
        Ok(())
    }

    /// Preview whether [`Dag::add_dependency`] would be rejected as a cycle
    pub fn would_create_cycle(&self, dependent: &LogicalId, dependency: &LogicalId) -> bool {
        if dependent == dependency {
            return true;
        }
        match (self.index.get(dependency), self.index.get(dependent)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, to, from, None),
            _ => false,
        }
    }

    /// Ids `id` depends on, in insertion order
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<LogicalId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        deps.sort();
        deps.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Check the graph is acyclic
    pub fn validate(&self) -> Result<(), DagError> {
        for component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.graph.contains_edge(n, n));
            if cyclic {
                let mut members: Vec<NodeIndex> = component;
                members.sort();
                return Err(DagError::CycleDetected(
                    members.into_iter().map(|n| self.graph[n].clone()).collect(),
                ));
            }
        }
        Ok(())
    }

    /// Topological order, breaking ties by insertion order
    ///
    /// A graph built in dependency order therefore comes back in exactly
    /// the order it was built.
    pub fn topological_sort(&self) -> Result<Vec<LogicalId>, DagError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node].clone());
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            self.validate()?;
            return Err(DagError::CycleDetected(Vec::new()));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<LogicalId> {
        names.iter().map(|n| LogicalId::new(*n)).collect()
    }

    fn dag_with(names: &[&str]) -> Dag {
        let mut dag = Dag::new();
        for id in ids(names) {
            dag.add_node(id);
        }
        dag
    }

    #[test]
    fn test_rejects_self_loop() {
        let mut dag = dag_with(&["A"]);
        let a = LogicalId::new("A");
        assert_eq!(dag.add_dependency(&a, &a), Err(DagError::SelfLoop(a)));
    }

    #[test]
    fn test_rejects_cycle_and_leaves_graph_untouched() {
        let mut dag = dag_with(&["A", "B", "C"]);
        let [a, b, c]: [LogicalId; 3] = ids(&["A", "B", "C"]).try_into().unwrap();

        dag.add_dependency(&b, &a).unwrap();
        dag.add_dependency(&c, &b).unwrap();

        assert!(dag.would_create_cycle(&a, &c));
        assert!(matches!(
            dag.add_dependency(&a, &c),
            Err(DagError::CycleDetected(_))
        ));
        assert_eq!(dag.edge_count(), 2);
    }

    #[test]
    fn test_repeated_edges_collapse() {
        let mut dag = dag_with(&["A", "B"]);
        let [a, b]: [LogicalId; 2] = ids(&["A", "B"]).try_into().unwrap();
        dag.add_dependency(&b, &a).unwrap();
        dag.add_dependency(&b, &a).unwrap();
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn test_unknown_node() {
        let mut dag = dag_with(&["A"]);
        let result = dag.add_dependency(&LogicalId::new("A"), &LogicalId::new("Z"));
        assert_eq!(result, Err(DagError::NodeNotFound(LogicalId::new("Z"))));
    }

    #[test]
    fn test_sort_keeps_insertion_order_when_possible() {
        let mut dag = dag_with(&["Logs", "Bucket", "Fn", "Role", "Stream"]);
        let [logs, bucket, func, role, stream]: [LogicalId; 5] =
            ids(&["Logs", "Bucket", "Fn", "Role", "Stream"]).try_into().unwrap();
        dag.add_dependency(&role, &bucket).unwrap();
        dag.add_dependency(&role, &func).unwrap();
        for dep in [&logs, &bucket, &func, &role] {
            dag.add_dependency(&stream, dep).unwrap();
        }

        assert_eq!(
            dag.topological_sort().unwrap(),
            ids(&["Logs", "Bucket", "Fn", "Role", "Stream"])
        );
    }

    #[test]
    fn test_sort_reports_cycle_members() {
        let mut dag = dag_with(&["A", "B", "C"]);
        let a = dag.index[&LogicalId::new("A")];
        let b = dag.index[&LogicalId::new("B")];
        // bypass add_dependency to plant a cycle
        dag.graph.add_edge(a, b, ());
        dag.graph.add_edge(b, a, ());

        assert_eq!(
            dag.topological_sort(),
            Err(DagError::CycleDetected(ids(&["A", "B"])))
        );
    }

    #[test]
    fn test_sort_moves_dependencies_forward() {
        let mut dag = dag_with(&["Consumer", "Producer"]);
        let [consumer, producer]: [LogicalId; 2] =
            ids(&["Consumer", "Producer"]).try_into().unwrap();
        dag.add_dependency(&consumer, &producer).unwrap();
        assert_eq!(dag.topological_sort().unwrap(), ids(&["Producer", "Consumer"]));
        assert_eq!(dag.dependencies_of(&consumer), vec![producer]);
    }
}
