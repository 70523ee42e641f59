//! Resource dependency graph
//!
//! Nodes are resource ids inserted in declaration order; edges run from a
//! dependency to its dependent, so a topological walk yields producers
//! before consumers. Ordering ties are broken by declaration order, which
//! makes the execution order fully deterministic.

use crate::error::{GraphError, Result};
use groundwork_core::{ResourceDecl, ResourceId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// Why an edge exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Implied by a `@type.name.attribute` reference
    Reference,
    /// Declared with `depends_on`
    Explicit,
}

/// Dependency graph over a set of resource declarations
#[derive(Debug)]
pub struct ResourceGraph {
    graph: DiGraph<ResourceId, EdgeKind>,
    node_map: HashMap<ResourceId, NodeIndex>,
}

impl ResourceGraph {
    /// Build the graph from declarations
    ///
    /// Fails on duplicate declarations and on edges pointing at undeclared
    /// resources. Cycles are reported by [`execution_order`], not here, so
    /// callers can still inspect a cyclic graph.
    ///
    /// [`execution_order`]: ResourceGraph::execution_order
    pub fn build(resources: &[ResourceDecl]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<ResourceId, NodeIndex> = HashMap::new();

        // Node indices follow declaration order
        for resource in resources {
            if node_map.contains_key(&resource.id) {
                return Err(GraphError::DuplicateResource(resource.id.to_string()));
            }
            let idx = graph.add_node(resource.id.clone());
            node_map.insert(resource.id.clone(), idx);
        }

        for resource in resources {
            let dependent = node_map[&resource.id];
            for reference in resource.references() {
                let producer = *node_map.get(&reference.target).ok_or_else(|| {
                    GraphError::MissingDependency {
                        target: reference.target.to_string(),
                        required_by: resource.id.to_string(),
                    }
                })?;
                graph.add_edge(producer, dependent, EdgeKind::Reference);
            }
            for dep in &resource.depends_on {
                let producer =
                    *node_map.get(dep).ok_or_else(|| GraphError::MissingDependency {
                        target: dep.to_string(),
                        required_by: resource.id.to_string(),
                    })?;
                graph.add_edge(producer, dependent, EdgeKind::Explicit);
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built resource graph"
        );
        Ok(Self { graph, node_map })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Direct dependencies of a node (its producers)
    pub fn dependencies(&self, id: &ResourceId) -> Result<Vec<ResourceId>> {
        let idx = self.index_of(id)?;
        let mut deps: Vec<ResourceId> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort_by_key(|d| self.node_map[d]);
        deps.dedup();
        Ok(deps)
    }

    /// Transitive dependents of a node, in declaration order
    ///
    /// These are the nodes the executor marks skipped when `id` fails.
    pub fn descendants(&self, id: &ResourceId) -> Result<Vec<ResourceId>> {
        let start = self.index_of(id)?;
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        let mut result: Vec<NodeIndex> = seen.into_iter().collect();
        result.sort();
        Ok(result.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Find a cycle, if one exists, and return its members in walk order
    pub fn detect_cycle(&self) -> Option<Vec<ResourceId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        fn visit(
            graph: &DiGraph<ResourceId, EdgeKind>,
            node: NodeIndex,
            marks: &mut HashMap<NodeIndex, Mark>,
            stack: &mut Vec<NodeIndex>,
        ) -> Option<Vec<NodeIndex>> {
            marks.insert(node, Mark::InProgress);
            stack.push(node);

            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                match marks.get(&next) {
                    None => {
                        if let Some(cycle) = visit(graph, next, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Some(Mark::InProgress) => {
                        // Found the back edge; the cycle is the stack suffix
                        let pos = stack.iter().position(|&n| n == next).unwrap();
                        return Some(stack[pos..].to_vec());
                    }
                    Some(Mark::Done) => {}
                }
            }

            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for node in self.graph.node_indices() {
            if !marks.contains_key(&node)
                && let Some(cycle) = visit(&self.graph, node, &mut marks, &mut stack)
            {
                return Some(cycle.into_iter().map(|n| self.graph[n].clone()).collect());
            }
        }
        None
    }

    /// Total execution order: every node appears after all of its producers
    ///
    /// Kahn's algorithm over a min-heap of ready nodes; since node indices
    /// follow declaration order, ties always resolve to the resource
    /// declared earliest.
    pub fn execution_order(&self) -> Result<Vec<ResourceId>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| {
                (
                    n,
                    self.graph.neighbors_directed(n, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&n, _)| Reverse(n))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node].clone());
            for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = in_degree.get_mut(&dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let cycle = self
                .detect_cycle()
                .unwrap_or_default()
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(GraphError::CircularDependency { cycle });
        }

        debug!(order_len = order.len(), "Computed execution order");
        Ok(order)
    }

    /// Plain-text rendering for the CLI: one line per node with its
    /// direct dependencies
    pub fn render(&self) -> Result<String> {
        let order = self.execution_order()?;
        let mut out = String::new();
        for id in &order {
            let deps = self.dependencies(id)?;
            if deps.is_empty() {
                out.push_str(&format!("{id}\n"));
            } else {
                let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
                out.push_str(&format!("{id}  <-  {}\n", deps.join(", ")));
            }
        }
        Ok(out)
    }

    fn index_of(&self, id: &ResourceId) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownResource(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::parse_kdl_string;

    fn graph_from(kdl: &str) -> ResourceGraph {
        let blueprint = parse_kdl_string(kdl, "test".to_string()).unwrap();
        ResourceGraph::build(&blueprint.resources).unwrap()
    }

    fn position(order: &[ResourceId], type_: &str, name: &str) -> usize {
        order
            .iter()
            .position(|id| id == &ResourceId::new(type_, name))
            .unwrap_or_else(|| panic!("{type_}.{name} not in order"))
    }

    #[test]
    fn test_order_respects_reference_edges() {
        let graph = graph_from(
            r#"
            resource "instance" "web-01" {
                network "@network.core.id"
                security_group "@security-group.web.id"
            }
            resource "security-group" "web" {
                network "@network.core.id"
            }
            resource "network" "core" {
                cidr "10.0.0.0/16"
            }
        "#,
        );

        let order = graph.execution_order().unwrap();
        assert!(position(&order, "network", "core") < position(&order, "security-group", "web"));
        assert!(position(&order, "security-group", "web") < position(&order, "instance", "web-01"));
    }

    #[test]
    fn test_order_respects_explicit_edges() {
        let graph = graph_from(
            r#"
            resource "instance" "app" {
                depends_on "volume.data"
            }
            resource "volume" "data" {
                size 100
            }
        "#,
        );

        let order = graph.execution_order().unwrap();
        assert!(position(&order, "volume", "data") < position(&order, "instance", "app"));
    }

    #[test]
    fn test_independent_nodes_keep_declaration_order() {
        let graph = graph_from(
            r#"
            resource "network" "b" {}
            resource "network" "a" {}
            resource "network" "c" {}
        "#,
        );

        let order = graph.execution_order().unwrap();
        assert_eq!(
            order,
            vec![
                ResourceId::new("network", "b"),
                ResourceId::new("network", "a"),
                ResourceId::new("network", "c"),
            ]
        );
    }

    #[test]
    fn test_tie_break_among_ready_nodes_is_declaration_order() {
        // Both instances become ready once the network exists; the one
        // declared first must come first.
        let graph = graph_from(
            r#"
            resource "instance" "zeta" {
                network "@network.core.id"
            }
            resource "instance" "alpha" {
                network "@network.core.id"
            }
            resource "network" "core" {}
        "#,
        );

        let order = graph.execution_order().unwrap();
        assert!(position(&order, "instance", "zeta") < position(&order, "instance", "alpha"));
    }

    #[test]
    fn test_cycle_is_an_error_naming_members() {
        let graph = graph_from(
            r#"
            resource "a" "one" {
                link "@b.two.id"
            }
            resource "b" "two" {
                link "@a.one.id"
            }
        "#,
        );

        let err = graph.execution_order().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("circular dependency"));
        assert!(msg.contains("a.one"));
        assert!(msg.contains("b.two"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let graph = graph_from(
            r#"
            resource "a" "one" {
                link "@a.one.id"
            }
        "#,
        );

        assert!(graph.detect_cycle().is_some());
        assert!(graph.execution_order().is_err());
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        let graph = graph_from(
            r#"
            resource "network" "core" {}
            resource "instance" "web" {
                network "@network.core.id"
            }
        "#,
        );
        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn test_missing_reference_names_both_ends() {
        let blueprint = parse_kdl_string(
            r#"
            resource "instance" "web-01" {
                network "@network.missing.id"
            }
        "#,
            "test".to_string(),
        )
        .unwrap();

        let err = ResourceGraph::build(&blueprint.resources).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("network.missing"));
        assert!(msg.contains("instance.web-01"));
    }

    #[test]
    fn test_duplicate_declaration_is_an_error() {
        let blueprint = parse_kdl_string(
            r#"
            resource "network" "core" {}
            resource "network" "core" {}
        "#,
            "test".to_string(),
        )
        .unwrap();

        let err = ResourceGraph::build(&blueprint.resources).unwrap_err();
        assert!(err.to_string().contains("network.core"));
    }

    #[test]
    fn test_descendants_are_transitive() {
        let graph = graph_from(
            r#"
            resource "network" "core" {}
            resource "security-group" "web" {
                network "@network.core.id"
            }
            resource "instance" "web-01" {
                security_group "@security-group.web.id"
            }
            resource "network" "other" {}
        "#,
        );

        let descendants = graph
            .descendants(&ResourceId::new("network", "core"))
            .unwrap();
        assert_eq!(
            descendants,
            vec![
                ResourceId::new("security-group", "web"),
                ResourceId::new("instance", "web-01"),
            ]
        );

        let none = graph
            .descendants(&ResourceId::new("network", "other"))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_render_lists_dependencies() {
        let graph = graph_from(
            r#"
            resource "network" "core" {}
            resource "instance" "web" {
                network "@network.core.id"
            }
        "#,
        );

        let rendered = graph.render().unwrap();
        assert!(rendered.contains("network.core"));
        assert!(rendered.contains("instance.web  <-  network.core"));
    }
}
