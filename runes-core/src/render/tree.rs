//! Host Tree Capabilities
//!
//! The reconciler never constructs or inspects nodes directly. Hosts implement
//! [`TreeNode`] for their own node type and the reconciler works purely
//! through it.

/// The capabilities the reconciler needs from a host node.
///
/// A node is either a text leaf or a structural node with attributes and
/// ordered children. Any node may be component-owned, in which case its
/// content is managed elsewhere and the reconciler treats it as opaque.
pub trait TreeNode: Sized {
    /// Canonical serialization. Two nodes are structurally equal when their
    /// canonical forms compare equal.
    type Canonical: PartialEq;

    fn canonical(&self) -> Self::Canonical;

    /// The text value, for text nodes only.
    fn text(&self) -> Option<&str>;

    /// Replace the text value. Ignored by structural nodes.
    fn set_text(&mut self, text: &str);

    /// Whether `self` can be updated in place to become `other`.
    ///
    /// Text nodes are of the same kind as every other text node; hosts
    /// usually also compare element tags here.
    fn same_kind(&self, other: &Self) -> bool;

    fn is_component_owned(&self) -> bool;

    fn child_count(&self) -> usize;

    fn child_at(&self, index: usize) -> Option<&Self>;

    fn child_at_mut(&mut self, index: usize) -> Option<&mut Self>;

    /// Remove and return every child, leaving the node empty.
    fn take_children(&mut self) -> Vec<Self>;

    fn remove_child(&mut self, index: usize) -> Option<Self>;

    /// Insert `child` at `index`, shifting later children right.
    fn insert_child(&mut self, index: usize, child: Self);

    /// Attribute pairs in a stable order.
    fn attributes(&self) -> Vec<(&str, &str)>;

    fn set_attribute(&mut self, name: &str, value: &str);

    fn remove_attribute(&mut self, name: &str);

    fn is_text(&self) -> bool {
        self.text().is_some()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Swap out every child for `children`.
    fn replace_children(&mut self, children: Vec<Self>) {
        drop(self.take_children());
        for (index, child) in children.into_iter().enumerate() {
            self.insert_child(index, child);
        }
    }
}
