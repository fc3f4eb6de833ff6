//! Graph Nodes
//!
//! This module defines the per-cell records that live in the dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

/// Unique identifier for a cell in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of cell a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A `State` cell. Sources have dependents but never dependencies.
    Source,

    /// A `Computed` cell. Has dependencies and may have dependents.
    Derived,

    /// An effect. Has dependencies, never dependents.
    Effect,
}

/// Dirty state of a node.
///
/// Writes always invalidate, so there is no "maybe dirty" middle ground: a
/// node is either up to date or must re-run before its value is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// The node must re-run.
    Dirty,
}

/// A node in the dependency graph.
///
/// Edge sets are insertion ordered so invalidation visits dependents in the
/// order they first subscribed.
#[derive(Debug)]
pub struct CellNode {
    id: NodeId,
    kind: NodeKind,
    dirty: DirtyState,

    /// Nodes this node read during its last evaluation.
    dependencies: IndexSet<NodeId>,

    /// Nodes that read this node during their last evaluation.
    dependents: IndexSet<NodeId>,
}

impl CellNode {
    /// Create a new node with a fresh ID.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            // Derived and effect nodes start dirty to force the first evaluation
            dirty: match kind {
                NodeKind::Source => DirtyState::Clean,
                NodeKind::Derived | NodeKind::Effect => DirtyState::Dirty,
            },
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty == DirtyState::Dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Mark the node as needing re-evaluation. Sources are never dirty.
    pub fn mark_dirty(&mut self) {
        if self.kind != NodeKind::Source {
            self.dirty = DirtyState::Dirty;
        }
    }

    pub fn add_dependency(&mut self, node_id: NodeId) {
        self.dependencies.insert(node_id);
    }

    pub fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.shift_remove(&node_id);
    }

    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    pub fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    pub fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }

    /// Drop every outgoing dependency, returning the IDs that were removed.
    pub fn take_dependencies(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependencies)
    }
}
