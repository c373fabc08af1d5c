//! Post-processing: deterministic cleanup of the emitted MyST tree.
//!
//! Citation resolution and grouping delete and splice inline nodes, which
//! leaves artefacts behind:
//!
//! - empty `text` nodes where a separator or parenthesis was consumed
//! - adjacent `text` nodes that the emitter would have coalesced
//! - table footnotes that nothing points at any more
//!
//! ## Rule Order
//!
//! Table footnotes are demoted first so that the text passes also see the
//! paragraphs they become. Empty text is dropped before merging so that
//! merging never has to skip over it.

use crate::tree::{rewrite, Node, Rewrite};
use std::collections::BTreeSet;

/// Apply all cleanup rules to an emitted tree.
///
/// Rules (applied in order):
/// 1. Demote unreferenced table footnotes to legend paragraphs
/// 2. Remove empty text nodes
/// 3. Merge adjacent text nodes
pub fn clean_tree(tree: &mut Node) {
    table_footnotes_to_legend(tree);
    remove_empty_text(tree);
    merge_adjacent_text(tree);
}

/// Identifiers targeted by any `footnoteReference` in `tree`.
pub fn referenced_footnotes(tree: &Node) -> BTreeSet<String> {
    tree.find_all(|n| n.is("footnoteReference"))
        .into_iter()
        .filter_map(|n| n.attr_str("identifier"))
        .map(str::to_string)
        .collect()
}

// ── Rule 1: Table footnotes to legend ────────────────────────────────────────

/// A table footnote nobody references is plain legend text.
///
/// The definition becomes a paragraph; one holding a single paragraph is
/// replaced by that paragraph.
pub fn table_footnotes_to_legend(tree: &mut Node) -> usize {
    let referenced = referenced_footnotes(tree);
    let mut demoted = 0;
    tree.walk_mut(&mut |node: &mut Node| {
        if !node.is("legend") {
            return;
        }
        for child in node.children_mut() {
            let orphan = child.is("footnoteDefinition")
                && !child
                    .attr_str("identifier")
                    .is_some_and(|id| referenced.contains(id));
            if !orphan {
                continue;
            }
            demoted += 1;
            let mut inner = child.children.take().unwrap_or_default();
            let single = matches!(inner.as_slice(), [only] if only.is("paragraph"));
            *child = if single {
                inner.remove(0)
            } else {
                Node::parent("paragraph", inner)
            };
        }
    });
    demoted
}

// ── Rule 2: Remove empty text ────────────────────────────────────────────────

fn remove_empty_text(tree: &mut Node) -> bool {
    rewrite(tree, &mut |n: &mut Node| {
        if n.is_text() && n.value.as_deref().unwrap_or("").is_empty() {
            Rewrite::Remove
        } else {
            Rewrite::Keep
        }
    })
}

// ── Rule 3: Merge adjacent text ──────────────────────────────────────────────

fn merge_adjacent_text(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        let Some(children) = node.children.take() else {
            return;
        };
        let mut merged: Vec<Node> = Vec::with_capacity(children.len());
        for child in children {
            match merged.last_mut() {
                Some(last) if last.is_text() && child.is_text() => {
                    let value = child.value.unwrap_or_default();
                    last.value.get_or_insert_with(String::new).push_str(&value);
                }
                _ => merged.push(child),
            }
        }
        node.children = Some(merged);
    });
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn footnote(id: &str) -> Node {
        Node::parent(
            "footnoteDefinition",
            vec![Node::parent("paragraph", vec![Node::text("note")])],
        )
        .with_attr("identifier", id)
    }

    #[test]
    fn test_unreferenced_table_footnote_demoted() {
        let mut tree = Node::parent(
            "root",
            vec![Node::parent(
                "container",
                vec![
                    Node::parent(
                        "table",
                        vec![Node::leaf("footnoteReference").with_attr("identifier", "t1")],
                    ),
                    Node::parent("legend", vec![footnote("t1"), footnote("t2")]),
                ],
            )],
        );
        assert_eq!(table_footnotes_to_legend(&mut tree), 1);
        let legend = tree.find_kind("legend").unwrap();
        assert_eq!(legend.children()[0].kind, "footnoteDefinition");
        assert_eq!(legend.children()[1].kind, "paragraph");
        assert_eq!(legend.children()[1].to_text(), "note");
    }

    #[test]
    fn test_footnotes_outside_legend_untouched() {
        let mut tree = Node::parent("root", vec![footnote("x")]);
        assert_eq!(table_footnotes_to_legend(&mut tree), 0);
    }

    #[test]
    fn test_text_cleanup() {
        let mut tree = Node::parent(
            "paragraph",
            vec![
                Node::text("a"),
                Node::text(""),
                Node::text("b"),
                Node::leaf("citeGroup"),
                Node::text("c"),
            ],
        );
        clean_tree(&mut tree);
        assert_eq!(tree.children().len(), 3);
        assert_eq!(tree.children()[0].value.as_deref(), Some("ab"));
    }
}
