//! Generic directed dependency graph for incremental builds.
//!
//! Unlike a task DAG, an include graph may legitimately contain cycles
//! (`a.h` includes `b.h` which includes `a.h`), so this graph accepts any
//! edge and leaves cycle handling to its traversals.
//!
//! Nodes live in an arena and are addressed by a stable [`NodeId`]. Every
//! node keeps two index sets that are exact transposes of each other:
//! - `dependencies`: nodes this node depends on (forward edges)
//! - `dependents`: nodes that depend on this node (reverse edges)
//!
//! # Example
//!
//! ```
//! use convenient_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::<&str>::new();
//! let main_c = graph.add_node("main.c");
//! let util_h = graph.add_node("util.h");
//! let base_h = graph.add_node("base.h");
//!
//! graph.add_edge(main_c, util_h).unwrap(); // main.c depends on util.h
//! graph.add_edge(util_h, base_h).unwrap(); // util.h depends on base.h
//!
//! // Touching base.h affects util.h and main.c
//! let affected = graph.transitive_dependents(base_h).unwrap();
//! assert_eq!(affected, vec![util_h, main_c]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

/// Node identifier in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// A node in the graph containing data and tracking its edges.
///
/// `BTreeSet` keeps neighbour iteration stable across runs.
#[derive(Debug, Clone)]
struct Node<N> {
    data: N,
    dependencies: BTreeSet<NodeId>,
    dependents: BTreeSet<NodeId>,
}

/// Arena-backed directed graph that tolerates cycles.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    nodes: Vec<Node<N>>,
    edge_count: usize,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DependencyGraph<N> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edge_count: 0,
        }
    }

    /// Add a node to the graph and return its ID.
    ///
    /// IDs are never reused or invalidated, so they stay valid while the
    /// arena grows.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        });
        id
    }

    /// Record that `dependent` depends on `dependency`.
    ///
    /// Both the forward and the reverse edge are inserted, so the two edge
    /// sets always stay transposes of each other. Self-edges and cycles are
    /// accepted. Returns `true` if the edge was new.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either node doesn't exist.
    pub fn add_edge(&mut self, dependent: NodeId, dependency: NodeId) -> GraphResult<bool> {
        self.check(dependent)?;
        self.check(dependency)?;

        let inserted = self.nodes[dependent.0].dependencies.insert(dependency);
        let _ = self.nodes[dependency.0].dependents.insert(dependent);
        if inserted {
            self.edge_count += 1;
        }
        Ok(inserted)
    }

    fn check(&self, id: NodeId) -> GraphResult<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(id))
        }
    }

    /// Get a reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node(&self, id: NodeId) -> GraphResult<&N> {
        self.nodes
            .get(id.0)
            .map(|node| &node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a mutable reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut N> {
        self.nodes
            .get_mut(id.0)
            .map(|node| &mut node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Iterate over all node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<N> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Iterate over all nodes with their IDs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), &node.data))
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of distinct edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Get all direct dependencies (forward edges) of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(id.0)
            .map(|node| node.dependencies.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get all direct dependents (reverse edges) of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(id.0)
            .map(|node| node.dependents.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// All nodes that depend on `id` directly or indirectly, in
    /// breadth-first order. `id` itself is only included if it sits on a
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn transitive_dependents(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.check(id)?;

        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();
        queue.extend(self.nodes[id.0].dependents.iter().copied());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current);
            for &next in &self.nodes[current.0].dependents {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        Ok(result)
    }

    /// Find cycles in the graph along dependency edges.
    ///
    /// Returns one representative path per back edge found by a depth-first
    /// search; a self-edge is reported as a one-node cycle.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<NodeId>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node_id in self.node_ids() {
            if !visited.contains(&node_id) {
                self.find_cycles_dfs(
                    node_id,
                    &mut visited,
                    &mut rec_stack,
                    &mut path,
                    &mut cycles,
                );
            }
        }

        cycles
    }

    fn find_cycles_dfs(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        rec_stack: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
        cycles: &mut Vec<Vec<NodeId>>,
    ) {
        let _ = visited.insert(node_id);
        let _ = rec_stack.insert(node_id);
        path.push(node_id);

        for &neighbor in &self.nodes[node_id.0].dependencies {
            if !visited.contains(&neighbor) {
                self.find_cycles_dfs(neighbor, visited, rec_stack, path, cycles);
            } else if rec_stack.contains(&neighbor) {
                if let Some(cycle_start) = path.iter().position(|&id| id == neighbor) {
                    cycles.push(path[cycle_start..].to_vec());
                }
            }
        }

        let _ = path.pop();
        let _ = rec_stack.remove(&node_id);
    }
}
