//! Rendering
//!
//! In-place reconciliation of host trees, and the components that drive it
//! from the reactive runtime.
//!
//! The reconciler only knows nodes through the [`TreeNode`] trait. [`Element`]
//! is a reference implementation used by the tests and benchmarks.

mod component;
mod element;
mod reconcile;
mod tree;

pub use component::{Component, Render};
pub use element::{Element, Hosted, NodeKey};
pub use reconcile::{reconcile, reconcile_children, Mutations};
pub use tree::TreeNode;
