//! Section flattening and heading-depth assignment.
//!
//! JATS nests `sec` elements arbitrarily deep; MyST wants a flat list of
//! `block`s whose headings carry their depth. The transform runs in three
//! passes:
//!
//! 1. Label each section recursively: drop a leading `label`, turn the
//!    `title` into a `heading` (or a bold paragraph for
//!    [`TitleStyle::Strong`]), tag `ack`/`app` with a `part`.
//! 2. Retype top-level sections to `block` and lift every nested section's
//!    children into its parent.
//! 3. Group any remaining loose top-level nodes into blocks.
//!
//! Sections without a recognisable title are passed through unchanged.

use crate::tree::{lift_where, Node};

/// How section titles are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleStyle {
    /// `heading` with `depth` and the section id.
    #[default]
    Heading,
    /// Paragraph wrapping a `bold` run (used inside abstracts).
    Strong,
}

fn is_section(node: &Node) -> bool {
    matches!(node.kind.as_str(), "sec" | "ack" | "app")
}

/// Flatten the sections below `tree` and wrap its children into blocks.
pub fn section_transform(tree: &mut Node, style: TitleStyle) {
    lift_where(tree, |n| n.is("app-group"));
    label_sections(tree, 1, style);
    for child in tree.children_mut().iter_mut() {
        if is_section(child) {
            child.kind = "block".to_string();
        }
    }
    lift_where(tree, is_section);
    block_nesting(tree);
}

fn label_sections(parent: &mut Node, depth: u32, style: TitleStyle) {
    for sec in parent.children_mut().iter_mut().filter(|n| is_section(n)) {
        let kind = sec.kind.clone();
        let id = sec.attr_str("id").map(str::to_string);
        let children = sec.children_mut();
        if children.first().is_some_and(|c| c.is("label")) {
            children.remove(0);
        }
        if children.first().is_some_and(|c| c.is("title")) {
            let is_ack_title =
                kind == "ack" && children[0].to_text().to_lowercase().starts_with("ack");
            if is_ack_title {
                children.remove(0);
            } else {
                let title = &mut children[0];
                match style {
                    TitleStyle::Strong => {
                        let inner = title.children.take().unwrap_or_default();
                        title.kind = "p".to_string();
                        title.children = Some(vec![Node::parent("bold", inner)]);
                    }
                    TitleStyle::Heading => {
                        title.kind = "heading".to_string();
                        if let Some(id) = &id {
                            title.set_attr("id", id.as_str());
                        }
                        title.set_attr("depth", depth);
                    }
                }
            }
        }
        match kind.as_str() {
            "ack" => sec.set_attr("part", "acknowledgments"),
            "app" => sec.set_attr("part", "appendix"),
            _ => {}
        }
        label_sections(sec, depth + 1, style);
    }
}

/// Group consecutive non-block children of `tree` into `block`s.
///
/// When there are no blocks at all, every child goes into a single block.
pub fn block_nesting(tree: &mut Node) {
    let children = tree.children.take().unwrap_or_default();
    if !children.iter().any(|c| c.is("block")) {
        tree.children = Some(vec![Node::parent("block", children)]);
        return;
    }
    let mut nested = Vec::with_capacity(children.len());
    let mut pending: Vec<Node> = Vec::new();
    for child in children {
        if child.is("block") {
            if !pending.is_empty() {
                nested.push(Node::parent("block", std::mem::take(&mut pending)));
            }
            nested.push(child);
        } else {
            pending.push(child);
        }
    }
    if !pending.is_empty() {
        nested.push(Node::parent("block", pending));
    }
    tree.children = Some(nested);
}
