//! Dependency Store
//!
//! `DependencyGraph` owns every node record and keeps both edge directions in
//! sync. It never runs user code, so callers may hold a borrow of it only for
//! the duration of a single call.
//!
//! # Invalidation
//!
//! A write to a source walks its dependents breadth-first:
//!
//! 1. Every reached derived or effect node is marked dirty.
//! 2. Derived nodes forward the walk to their own dependents.
//! 3. Reached effects are collected, in visit order, for scheduling.
//!
//! Derived nodes are only marked, never recomputed here (lazy pull).

use std::collections::{HashMap, HashSet, VecDeque};

use smallvec::SmallVec;

use super::node::{CellNode, NodeId, NodeKind};

/// Effects reached by one invalidation walk.
pub type Invalidated = SmallVec<[NodeId; 8]>;

/// Bidirectional edge store for the signal graph.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<NodeId, CellNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh node of the given kind and return its ID.
    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        let node = CellNode::new(kind);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge that touches it.
    pub fn remove(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.remove(&node_id) else {
            return;
        };

        for dep_id in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.remove_dependent(node_id);
            }
        }

        for dependent_id in node.dependents() {
            if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                dependent.remove_dependency(node_id);
            }
        }
    }

    pub fn get(&self, node_id: NodeId) -> Option<&CellNode> {
        self.nodes.get(&node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Record that `dependent` read `dependency`.
    ///
    /// Edges are only added when both ends are still alive.
    pub fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        if dependency == dependent
            || !self.nodes.contains_key(&dependency)
            || !self.nodes.contains_key(&dependent)
        {
            return;
        }
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.add_dependent(dependent);
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.add_dependency(dependency);
        }
        tracing::trace!(%dependency, %dependent, "edge added");
    }

    /// Drop every dependency of `node_id`, unlinking the reverse edges too.
    ///
    /// Called before a node re-evaluates so its dependency set is rebuilt from
    /// scratch.
    pub fn clear_dependencies(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        for dep_id in node.take_dependencies() {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_dependent(node_id);
            }
        }
    }

    pub fn is_dirty(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(CellNode::is_dirty)
    }

    pub fn mark_clean(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_clean();
        }
    }

    pub fn mark_dirty(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_dirty();
        }
    }

    /// Mark everything downstream of `source` dirty.
    ///
    /// Returns the effects that were reached, in breadth-first order.
    pub fn invalidate(&mut self, source: NodeId) -> Invalidated {
        let mut effects = Invalidated::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = match self.nodes.get(&source) {
            Some(node) => node.dependents().iter().copied().collect(),
            None => return effects,
        };

        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.mark_dirty();
            match node.kind() {
                NodeKind::Effect => effects.push(node_id),
                NodeKind::Derived => queue.extend(node.dependents().iter().copied()),
                NodeKind::Source => {}
            }
        }

        tracing::trace!(%source, reached = visited.len(), effects = effects.len(), "invalidated");
        effects
    }

    pub fn dependency_count(&self, node_id: NodeId) -> usize {
        self.nodes.get(&node_id).map_or(0, |n| n.dependencies().len())
    }

    pub fn dependent_count(&self, node_id: NodeId) -> usize {
        self.nodes.get(&node_id).map_or(0, |n| n.dependents().len())
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
