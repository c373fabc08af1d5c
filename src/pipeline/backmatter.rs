//! Relocation of back-matter content and floating supplements into the body.
//!
//! The back-matter itself is left untouched: reference resolution reads it
//! independently afterwards.

use crate::tree::{remove_where, Node};

const RELOCATED: &[&str] = &["fn-group", "sec", "ack", "app-group"];

fn separator() -> Node {
    Node::leaf("hr")
}

/// Append copies of the back-matter footnotes, sections, acknowledgments and
/// appendices to `body`, after a separator. Returns how many were copied.
pub fn back_to_body(body: &mut Node, back: Option<&Node>) -> usize {
    let Some(back) = back else {
        return 0;
    };
    let copies: Vec<Node> = back
        .children()
        .iter()
        .filter(|c| RELOCATED.contains(&c.kind.as_str()))
        .cloned()
        .collect();
    if copies.is_empty() {
        return 0;
    }
    let n = copies.len();
    let children = body.children_mut();
    children.push(separator());
    children.extend(copies);
    n
}

fn is_float(node: &Node) -> bool {
    node.is("supplementary-material") && node.attr_str("position") == Some("float")
}

/// Move every floating `supplementary-material` to the end of `body`.
///
/// Relative order among the floats is preserved and the `position`
/// attribute is dropped from the moved copies.
pub fn float_to_end(body: &mut Node) -> usize {
    let floats: Vec<Node> = body
        .find_all(is_float)
        .into_iter()
        .map(|n| {
            let mut copy = n.clone();
            copy.remove_attr("position");
            copy
        })
        .collect();
    if floats.is_empty() {
        return 0;
    }
    remove_where(body, is_float);
    let n = floats.len();
    let children = body.children_mut();
    children.push(separator());
    children.extend(floats);
    n
}
