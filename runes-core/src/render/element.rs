//! Reference Host Tree
//!
//! [`Element`] is a small owned tree implementing [`TreeNode`]. It is what the
//! tests and benchmarks reconcile, and a template for hosts wiring their own
//! node type.
//!
//! Canonical form is the node's JSON value. Object keys in a JSON value are
//! sorted, so canonical equality ignores attribute order even though the
//! attributes themselves keep insertion order in an `IndexMap`. Every node
//! carries a [`NodeKey`] that survives in-place updates but not replacement,
//! which lets callers observe exactly which nodes the reconciler re-created.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::component::Component;
use super::tree::TreeNode;

/// Identity of an element, assigned at construction.
///
/// Clones keep the key of the element they were cloned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// A node of the reference tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text {
        #[serde(skip)]
        key: NodeKey,
        text: String,
    },
    Node {
        #[serde(skip)]
        key: NodeKey,
        tag: String,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attributes: IndexMap<String, String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<Element>,
    },
    /// The root of a component, embedded in a parent tree.
    Component(Hosted),
}

/// A component root placed inside another tree.
///
/// The content is shared with the component and kept up to date by its own
/// effect. Clones share the same root.
#[derive(Debug, Clone)]
pub struct Hosted {
    key: NodeKey,
    root: Rc<RefCell<Element>>,
}

impl Hosted {
    pub fn root(&self) -> &Rc<RefCell<Element>> {
        &self.root
    }
}

impl Serialize for Hosted {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Hosted", 1)?;
        // Borrowed while the component re-renders
        match self.root.try_borrow() {
            Ok(root) => state.serialize_field("root", &*root)?,
            Err(_) => state.serialize_field("root", &Value::Null)?,
        }
        state.end()
    }
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Element::Text {
            key: NodeKey::next(),
            text: text.into(),
        }
    }

    /// A structural node with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Element::Node {
            key: NodeKey::next(),
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Embed a component root.
    pub fn hosted(root: Rc<RefCell<Element>>) -> Self {
        Element::Component(Hosted {
            key: NodeKey::next(),
            root,
        })
    }

    /// Set an attribute. Ignored on text and component nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Element::Node { attributes, .. } = &mut self {
            attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. Ignored on text and component nodes.
    pub fn child(self, child: Element) -> Self {
        self.children([child])
    }

    /// Append children. Ignored on text and component nodes.
    pub fn children(mut self, new: impl IntoIterator<Item = Element>) -> Self {
        if let Element::Node { children, .. } = &mut self {
            children.extend(new);
        }
        self
    }

    pub fn key(&self) -> NodeKey {
        match self {
            Element::Text { key, .. } | Element::Node { key, .. } => *key,
            Element::Component(hosted) => hosted.key,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Element::Node { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn as_hosted(&self) -> Option<&Hosted> {
        match self {
            Element::Component(hosted) => Some(hosted),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key(), %err, "element failed to serialize");
                Value::Null
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl TreeNode for Element {
    type Canonical = Value;

    fn canonical(&self) -> Value {
        self.to_json()
    }

    fn text(&self) -> Option<&str> {
        self.as_text()
    }

    fn set_text(&mut self, new: &str) {
        if let Element::Text { text, .. } = self {
            new.clone_into(text);
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Text { .. }, Element::Text { .. }) => true,
            (Element::Node { tag: a, .. }, Element::Node { tag: b, .. }) => a == b,
            (Element::Component(_), Element::Component(_)) => true,
            _ => false,
        }
    }

    fn is_component_owned(&self) -> bool {
        matches!(self, Element::Component(_))
    }

    fn child_count(&self) -> usize {
        match self {
            Element::Node { children, .. } => children.len(),
            _ => 0,
        }
    }

    fn child_at(&self, index: usize) -> Option<&Self> {
        match self {
            Element::Node { children, .. } => children.get(index),
            _ => None,
        }
    }

    fn child_at_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self {
            Element::Node { children, .. } => children.get_mut(index),
            _ => None,
        }
    }

    fn take_children(&mut self) -> Vec<Self> {
        match self {
            Element::Node { children, .. } => std::mem::take(children),
            _ => Vec::new(),
        }
    }

    fn remove_child(&mut self, index: usize) -> Option<Self> {
        match self {
            Element::Node { children, .. } if index < children.len() => Some(children.remove(index)),
            _ => None,
        }
    }

    fn insert_child(&mut self, index: usize, child: Self) {
        match self {
            Element::Node { children, .. } => {
                let index = index.min(children.len());
                children.insert(index, child);
            }
            _ => tracing::warn!(key = %self.key(), "cannot insert a child into a leaf"),
        }
    }

    fn attributes(&self) -> Vec<(&str, &str)> {
        match self {
            Element::Node { attributes, .. } => attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Element::Node { attributes, .. } = self {
            attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_attribute(&mut self, name: &str) {
        if let Element::Node { attributes, .. } = self {
            attributes.shift_remove(name);
        }
    }
}

impl Component<Element> {
    /// This component as a node of a parent tree.
    pub fn element(&self) -> Element {
        Element::hosted(self.root().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_canonically() {
        let tree = Element::new("div")
            .attr("class", "card")
            .children([Element::text("hi"), Element::new("br")]);

        assert_eq!(
            tree.to_json(),
            json!({
                "type": "node",
                "tag": "div",
                "attributes": { "class": "card" },
                "children": [
                    { "type": "text", "text": "hi" },
                    { "type": "node", "tag": "br" },
                ],
            })
        );
    }

    #[test]
    fn keys_are_unique_and_survive_clone() {
        let a = Element::text("x");
        let b = Element::text("x");
        assert_ne!(a.key(), b.key());
        assert_eq!(a.clone().key(), a.key());
        // Keys are not part of the canonical form
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn attribute_order_does_not_affect_equality() {
        let a = Element::new("a").attr("href", "/").attr("title", "home");
        let b = Element::new("a").attr("title", "home").attr("href", "/");
        assert_eq!(a.canonical(), b.canonical());

        // The node itself still reports insertion order
        assert_eq!(b.attributes(), vec![("title", "home"), ("href", "/")]);
    }

    #[test]
    fn hosted_roots_serialize_their_content() {
        let root = Rc::new(RefCell::new(Element::new("span").child(Element::text("inner"))));
        let host = Element::new("div").child(Element::hosted(root.clone()));

        assert_eq!(
            host.to_json()["children"][0],
            json!({
                "type": "component",
                "root": {
                    "type": "node",
                    "tag": "span",
                    "children": [{ "type": "text", "text": "inner" }],
                },
            })
        );

        // Busy roots serialize as null rather than failing
        let _busy = root.borrow_mut();
        assert_eq!(host.to_json()["children"][0]["root"], Value::Null);
    }

    #[test]
    fn tree_node_primitives() {
        let mut node = Element::new("ul").children([Element::text("a"), Element::text("c")]);
        node.insert_child(1, Element::text("b"));
        assert_eq!(node.child_count(), 3);
        assert_eq!(node.child_at(1).and_then(Element::as_text), Some("b"));

        let removed = node.remove_child(0);
        assert_eq!(removed.as_ref().and_then(Element::as_text), Some("a"));
        assert!(node.remove_child(10).is_none());

        node.set_attribute("role", "list");
        assert_eq!(node.attribute("role"), Some("list"));
        node.remove_attribute("role");
        assert!(node.attributes().is_empty());

        assert_eq!(node.take_children().len(), 2);
        assert_eq!(node.child_count(), 0);
    }

    #[test]
    fn same_kind_compares_tags() {
        assert!(Element::new("p").same_kind(&Element::new("p")));
        assert!(!Element::new("p").same_kind(&Element::new("div")));
        assert!(Element::text("a").same_kind(&Element::text("b")));
        assert!(!Element::text("a").same_kind(&Element::new("a")));
    }
}
