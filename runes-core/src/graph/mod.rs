//! Dependency Graph
//!
//! This module implements the graph that records which cells read which other
//! cells during evaluation.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes represent state cells (sources), computed cells (derived) or effects
//! - Edges represent reads: if A read B during its last evaluation, there is an
//!   edge from B to A
//!
//! When a state cell is written, every node downstream of it is marked dirty.
//! Derived nodes wait to be pulled; effects are handed to the scheduler.
//!
//! # Design Decisions
//!
//! 1. The graph is centralized per runtime rather than spread across cells, so
//!    edges can be rebuilt wholesale each time a node re-evaluates.
//!
//! 2. The graph is indexed by node ID for O(1) lookups.
//!
//! 3. Both forward (dependencies) and reverse (dependents) edges are kept so a
//!    node can be unlinked from both sides without scanning.

mod dependency;
mod node;

pub use dependency::{DependencyGraph, Invalidated};
pub use node::{CellNode, DirtyState, NodeId, NodeKind};
