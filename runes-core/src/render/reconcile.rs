//! In-Place Tree Reconciliation
//!
//! Updates a previously rendered tree so it matches a freshly rendered
//! candidate, touching as little of it as possible.
//!
//! # Algorithm
//!
//! For each (previous, candidate) pair, pre-order:
//!
//! 1. Structurally equal pairs are left alone.
//! 2. Component-owned nodes are never entered. Two of them facing each other
//!    are skipped; one facing a plain node is replaced.
//! 3. Nodes of different kinds (text against structural, or different tags)
//!    are replaced in their slot.
//! 4. Text nodes get their text updated.
//! 5. Structural nodes get their attributes diffed. Then:
//!    - a different number of children replaces all children wholesale;
//!    - otherwise children are reconciled pairwise by index.
//!
//! Children are never matched across positions. A child-count change always
//! rebuilds that level.

use super::tree::TreeNode;

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
    /// Text values rewritten.
    pub texts: usize,
    pub attributes_set: usize,
    pub attributes_removed: usize,
    /// Parents whose children were swapped out wholesale.
    pub children_replaced: usize,
    /// Single nodes replaced in their slot.
    pub nodes_replaced: usize,
    /// Component-owned pairs left untouched.
    pub components_skipped: usize,
}

impl Mutations {
    /// Total number of mutations applied. Skipped components do not count.
    pub fn total(&self) -> usize {
        self.texts
            + self.attributes_set
            + self.attributes_removed
            + self.children_replaced
            + self.nodes_replaced
    }

    /// Returns true if the previous tree was not modified.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Mutate `previous` in place until it matches `candidate`.
pub fn reconcile<N: TreeNode>(previous: &mut N, candidate: N) -> Mutations {
    let mut mutations = Mutations::default();
    reconcile_node(previous, candidate, &mut mutations);
    mutations
}

/// Reconcile the children of `parent` against `children`, leaving `parent`
/// itself alone.
///
/// This is how a component applies a fresh render to its root.
pub fn reconcile_children<N: TreeNode>(parent: &mut N, children: Vec<N>) -> Mutations {
    let mut mutations = Mutations::default();
    reconcile_child_list(parent, children, &mut mutations);
    mutations
}

fn reconcile_node<N: TreeNode>(previous: &mut N, candidate: N, mutations: &mut Mutations) {
    if previous.canonical() == candidate.canonical() {
        return;
    }

    match (previous.is_component_owned(), candidate.is_component_owned()) {
        (true, true) => {
            mutations.components_skipped += 1;
            return;
        }
        (false, false) => {}
        _ => {
            replace_node(previous, candidate, mutations);
            return;
        }
    }

    if !previous.same_kind(&candidate) {
        replace_node(previous, candidate, mutations);
        return;
    }

    if previous.is_text() {
        if let Some(text) = candidate.text() {
            if previous.text() != Some(text) {
                tracing::trace!(text, "update text");
                previous.set_text(text);
                mutations.texts += 1;
            }
        }
        return;
    }

    reconcile_attributes(previous, &candidate, mutations);

    let mut candidate = candidate;
    reconcile_child_list(previous, candidate.take_children(), mutations);
}

fn replace_node<N: TreeNode>(previous: &mut N, candidate: N, mutations: &mut Mutations) {
    tracing::trace!("replace node");
    *previous = candidate;
    mutations.nodes_replaced += 1;
}

fn reconcile_attributes<N: TreeNode>(previous: &mut N, candidate: &N, mutations: &mut Mutations) {
    // Collected up front: the previous node is mutated below
    let stale: Vec<String> = previous
        .attributes()
        .into_iter()
        .filter(|(name, _)| candidate.attribute(name).is_none())
        .map(|(name, _)| name.to_owned())
        .collect();

    for (name, value) in candidate.attributes() {
        if previous.attribute(name) != Some(value) {
            tracing::trace!(name, value, "set attribute");
            previous.set_attribute(name, value);
            mutations.attributes_set += 1;
        }
    }

    for name in stale {
        tracing::trace!(name, "remove attribute");
        previous.remove_attribute(&name);
        mutations.attributes_removed += 1;
    }
}

fn reconcile_child_list<N: TreeNode>(parent: &mut N, children: Vec<N>, mutations: &mut Mutations) {
    if parent.child_count() != children.len() {
        tracing::trace!(
            from = parent.child_count(),
            to = children.len(),
            "replace children"
        );
        parent.replace_children(children);
        mutations.children_replaced += 1;
        return;
    }

    for (index, candidate) in children.into_iter().enumerate() {
        let Some(owned) = parent.child_at(index).map(N::is_component_owned) else {
            break;
        };

        match (owned, candidate.is_component_owned()) {
            (true, true) => mutations.components_skipped += 1,
            (true, false) | (false, true) => {
                tracing::trace!(index, "replace component slot");
                drop(parent.remove_child(index));
                parent.insert_child(index, candidate);
                mutations.nodes_replaced += 1;
            }
            (false, false) => {
                if let Some(previous) = parent.child_at_mut(index) {
                    reconcile_node(previous, candidate, mutations);
                }
            }
        }
    }
}
