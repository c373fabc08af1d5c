//! Generic tree model shared by the XML reader, the normalizer and the
//! emitter.
//!
//! A [`Node`] is a type tag, an optional ordered list of children, an
//! optional scalar `value`, and a bag of arbitrary JSON attributes. It
//! serialises flat (`{"type": "paragraph", "children": [...], "label": ...}`)
//! so the emitted tree can be written out as MyST JSON directly.
//!
//! ## Removal protocol
//!
//! Structural rewrites never retype a node into a marker string. A rewrite
//! callback returns a [`Rewrite`] decision and [`rewrite`] applies it in one
//! place, reporting whether anything changed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Attribute bag of a [`Node`].
pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub attrs: Attrs,
}

// ── Construction ─────────────────────────────────────────────────────────

impl Node {
    /// A parent node with an empty child list.
    pub fn element(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            children: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// A parent node with the given children.
    pub fn parent(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            children: Some(children),
            ..Default::default()
        }
    }

    /// A node without a child list.
    pub fn leaf(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Set `key` only when `value` is present.
    pub fn with_opt_attr(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), v.into());
        }
        self
    }
}

// ── Accessors ────────────────────────────────────────────────────────────

impl Node {
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// String attribute, or `None` when absent or not a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn attr_bool(&self, key: &str) -> bool {
        self.attrs.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<Value> {
        self.attrs.remove(key)
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Mutable child list, created empty on a leaf.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        self.children.get_or_insert_with(Vec::new)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children().first()
    }

    /// Concatenated `value` of this node and all descendants, in order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(v) = &self.value {
            out.push_str(v);
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }
}

// ── Selection ────────────────────────────────────────────────────────────

impl Node {
    /// First descendant (pre-order, excluding `self`) matching `pred`.
    pub fn find(&self, pred: impl Fn(&Node) -> bool + Copy) -> Option<&Node> {
        for child in self.children() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    /// First descendant of the given type.
    pub fn find_kind(&self, kind: &str) -> Option<&Node> {
        self.find(|n| n.kind == kind)
    }

    pub fn find_mut(&mut self, pred: impl Fn(&Node) -> bool + Copy) -> Option<&mut Node> {
        for child in self.children.iter_mut().flatten() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (pre-order, excluding `self`) matching `pred`.
    pub fn find_all(&self, pred: impl Fn(&Node) -> bool + Copy) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_all(pred, &mut out);
        out
    }

    fn collect_all<'a>(&'a self, pred: impl Fn(&Node) -> bool + Copy, out: &mut Vec<&'a Node>) {
        for child in self.children() {
            if pred(child) {
                out.push(child);
            }
            child.collect_all(pred, out);
        }
    }

    pub fn count(&self, pred: impl Fn(&Node) -> bool + Copy) -> usize {
        self.find_all(pred).len()
    }

    /// Visit `self` and every descendant, parents before children.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in self.children.iter_mut().flatten() {
            child.walk_mut(f);
        }
    }
}

// ── Rewriting ────────────────────────────────────────────────────────────

/// Decision returned by a rewrite callback for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Keep the (possibly mutated) node and descend into it.
    Keep,
    /// Drop the node and its subtree.
    Remove,
    /// Splice the node's children into its parent in its place.
    ReplaceWithChildren,
}

/// Apply `f` top-down to every descendant of `root`.
///
/// Lifted children are visited in turn, so a chain of wrappers collapses in
/// a single call. Returns `true` when any node was removed or lifted.
pub fn rewrite(root: &mut Node, f: &mut impl FnMut(&mut Node) -> Rewrite) -> bool {
    let Some(children) = root.children.take() else {
        return false;
    };
    let mut dirty = false;
    let mut queue: VecDeque<Node> = children.into();
    let mut kept = Vec::with_capacity(queue.len());
    while let Some(mut node) = queue.pop_front() {
        match f(&mut node) {
            Rewrite::Keep => {
                dirty |= rewrite(&mut node, f);
                kept.push(node);
            }
            Rewrite::Remove => dirty = true,
            Rewrite::ReplaceWithChildren => {
                dirty = true;
                for child in node.children.take().unwrap_or_default().into_iter().rev() {
                    queue.push_front(child);
                }
            }
        }
    }
    root.children = Some(kept);
    dirty
}

/// Remove every descendant matching `pred`.
pub fn remove_where(root: &mut Node, pred: impl Fn(&Node) -> bool) -> bool {
    rewrite(root, &mut |n: &mut Node| if pred(n) { Rewrite::Remove } else { Rewrite::Keep })
}

/// Replace every descendant matching `pred` with its children.
pub fn lift_where(root: &mut Node, pred: impl Fn(&Node) -> bool) -> bool {
    rewrite(root, &mut |n: &mut Node| {
        if pred(n) {
            Rewrite::ReplaceWithChildren
        } else {
            Rewrite::Keep
        }
    })
}

// ── Labels ───────────────────────────────────────────────────────────────

/// Normalised `(label, identifier)` pair for a cross-reference target.
///
/// Whitespace runs collapse to one space; the identifier is the lower-cased
/// label. Blank input has no label.
pub fn normalize_label(label: &str) -> Option<(String, String)> {
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        return None;
    }
    let identifier = label.to_lowercase();
    Some((label, identifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::parent(
            "root",
            vec![
                Node::parent("p", vec![Node::text("a"), Node::parent("b", vec![Node::text("b")])]),
                Node::parent("wrap", vec![Node::parent("wrap", vec![Node::text("c")])]),
                Node::leaf("hr"),
            ],
        )
    }

    #[test]
    fn test_serialises_flat() {
        let node = Node::parent("heading", vec![Node::text("x")])
            .with_attr("depth", 2)
            .with_attr("enumerated", true);
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(
            v,
            json!({"type": "heading", "depth": 2, "enumerated": true,
                   "children": [{"type": "text", "value": "x"}]})
        );
        let back: Node = serde_json::from_value(v).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_to_text_concatenates() {
        assert_eq!(sample().to_text(), "abc");
    }

    #[test]
    fn test_find_is_preorder() {
        let tree = sample();
        assert_eq!(tree.find_kind("b").map(|n| n.to_text()), Some("b".into()));
        assert_eq!(tree.find_all(|n| n.is("wrap")).len(), 2);
        assert!(tree.find_kind("root").is_none());
    }

    #[test]
    fn test_rewrite_lifts_nested_wrappers() {
        let mut tree = sample();
        assert!(lift_where(&mut tree, |n| n.is("wrap")));
        let kinds: Vec<_> = tree.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["p", "text", "hr"]);
        assert!(!lift_where(&mut tree, |n| n.is("wrap")), "second pass is clean");
    }

    #[test]
    fn test_rewrite_remove_drops_subtree() {
        let mut tree = sample();
        assert!(remove_where(&mut tree, |n| n.is("b")));
        assert_eq!(tree.to_text(), "ac");
    }

    #[test]
    fn test_rewrite_keep_reports_clean() {
        let mut tree = sample();
        assert!(!rewrite(&mut tree, &mut |_| Rewrite::Keep));
        assert_eq!(tree, sample());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(
            normalize_label("  Fig \n 1 "),
            Some(("Fig 1".to_string(), "fig 1".to_string()))
        );
        assert_eq!(normalize_label(" \t"), None);
    }
}
