//! Citation grouping: turn emitted `cite` markers into punctuation-free
//! `citeGroup` clusters.
//!
//! Rules run in a fixed order and each reports whether it changed the tree;
//! the sequence repeats until a full pass is clean.
//!
//! | # | Rule                                                            |
//! |---|-----------------------------------------------------------------|
//! | 1 | drop cite children                                              |
//! | 2 | wrap lone cites in a singleton group                            |
//! | 3 | flatten a group nested in a group                               |
//! | 4 | merge adjacent groups (the first group's kind wins)             |
//! | 5 | merge groups separated by `,` / `;` / `and`                     |
//! | 6 | expand `a – d` ranges using bibliography order                  |
//! | 7 | consume flanking `(` `)` / `[` `]` and mark parenthetical       |
//! | 8 | lift a group out of a superscript                               |
//! | 9 | ensure a space before a group                                   |

use crate::tree::{normalize_label, Node};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static RE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([,;]|[,;]?\s*(and))\s*$").unwrap());

/// Only `-` and `–` (en dash) separate a range.
static RE_RANGE_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-–]\s*$").unwrap());

const MAX_PASSES: usize = 64;

/// Group the citations in `tree`. `order` lists cite labels in bibliography
/// declaration order. Returns `true` when anything changed.
pub fn inline_citations(tree: &mut Node, order: &[String]) -> bool {
    let mut changed = false;
    for pass in 1..=MAX_PASSES {
        let mut dirty = false;
        dirty |= remove_cite_children(tree);
        dirty |= cites_to_groups(tree);
        dirty |= flatten_nested_groups(tree);
        dirty |= combine_adjacent_groups(tree);
        dirty |= remove_separators(tree);
        dirty |= expand_ranges(tree, order);
        dirty |= remove_parentheses(tree);
        dirty |= remove_superscript(tree);
        dirty |= space_before_groups(tree);
        if !dirty {
            debug!("Citation grouping settled after {pass} passes");
            return changed;
        }
        changed = true;
    }
    warn!("Citation grouping did not settle after {MAX_PASSES} passes");
    changed
}

/// Call `f` on `node` and every descendant; `f` edits the node's children.
fn each_parent(node: &mut Node, f: &mut impl FnMut(&mut Node) -> bool) -> bool {
    let mut dirty = f(node);
    for child in node.children.iter_mut().flatten() {
        dirty |= each_parent(child, f);
    }
    dirty
}

fn value(node: &Node) -> &str {
    node.value.as_deref().unwrap_or("")
}

fn is_group(node: Option<&Node>) -> bool {
    node.is_some_and(|n| n.is("citeGroup"))
}

fn text_at(children: &[Node], i: usize) -> Option<&str> {
    children.get(i).filter(|n| n.is_text()).map(value)
}

// ── Rules ────────────────────────────────────────────────────────────────

fn remove_cite_children(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        if n.is("cite") && n.children.is_some() {
            n.children = None;
            return true;
        }
        false
    })
}

fn cites_to_groups(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        if n.is("citeGroup") {
            return false;
        }
        let mut dirty = false;
        for child in n.children.iter_mut().flatten() {
            if child.is("cite") {
                let cite = std::mem::take(child);
                let kind = cite.attr("kind").cloned();
                *child = Node::parent("citeGroup", vec![cite]).with_opt_attr("kind", kind);
                dirty = true;
            }
        }
        dirty
    })
}

fn flatten_nested_groups(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        if !n.is("citeGroup") || !n.children().iter().any(|c| c.is("citeGroup")) {
            return false;
        }
        let children = n.children.take().unwrap_or_default();
        let flat = children
            .into_iter()
            .flat_map(|c| {
                if c.is("citeGroup") {
                    c.children.unwrap_or_default()
                } else {
                    vec![c]
                }
            })
            .collect();
        n.children = Some(flat);
        true
    })
}

fn combine_adjacent_groups(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let Some(children) = n.children.as_mut() else {
            return false;
        };
        let mut dirty = false;
        let mut i = 0;
        while i + 1 < children.len() {
            if !(children[i].is("citeGroup") && children[i + 1].is("citeGroup")) {
                i += 1;
                continue;
            }
            merge_into_next(children, i);
            dirty = true;
        }
        dirty
    })
}

/// Fold the group at `i` into the group after it: its cites go first and its
/// `kind` wins.
fn merge_into_next(children: &mut Vec<Node>, i: usize) {
    let mut cur = children.remove(i);
    let next = &mut children[i];
    let mut merged = cur.children.take().unwrap_or_default();
    merged.append(next.children_mut());
    next.children = Some(merged);
    match cur.remove_attr("kind") {
        Some(kind) => next.set_attr("kind", kind),
        None => {
            next.remove_attr("kind");
        }
    }
}

fn remove_separators(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let Some(children) = n.children.as_mut() else {
            return false;
        };
        let mut dirty = false;
        let mut i = 0;
        while i + 2 < children.len() {
            let separated = is_group(children.get(i))
                && text_at(children, i + 1).is_some_and(|t| RE_SEPARATOR.is_match(t))
                && is_group(children.get(i + 2));
            if separated {
                children.remove(i + 1);
                merge_into_next(children, i);
                dirty = true;
                continue;
            }
            i += 1;
        }
        dirty
    })
}

/// Single cite of a singleton group.
fn only_cite(group: &Node) -> Option<&Node> {
    match group.children() {
        [cite] if cite.is("cite") => Some(cite),
        _ => None,
    }
}

fn expand_ranges(tree: &mut Node, order: &[String]) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let Some(children) = n.children.as_mut() else {
            return false;
        };
        let mut dirty = false;
        let mut i = 0;
        while i + 2 < children.len() {
            if let Some(group) = range_group(&children[i..i + 3], order) {
                children.splice(i..i + 3, [group]);
                dirty = true;
            }
            i += 1;
        }
        dirty
    })
}

/// The expanded group for `[group, dash, group]`, when the endpoints are
/// known and ascending.
fn range_group(window: &[Node], order: &[String]) -> Option<Node> {
    let [first_group, dash, last_group] = window else {
        return None;
    };
    if !(first_group.is("citeGroup") && last_group.is("citeGroup")) {
        return None;
    }
    if !(dash.is_text() && RE_RANGE_DASH.is_match(value(dash))) {
        return None;
    }
    let first = only_cite(first_group)?;
    let last = only_cite(last_group)?;
    let position = |cite: &Node| {
        let label = cite.attr_str("label")?;
        order.iter().position(|o| o == label)
    };
    let (start, end) = (position(first)?, position(last)?);
    if start >= end {
        return None;
    }
    let cites = order[start..=end]
        .iter()
        .map(|label| {
            let mut cite = Node::leaf("cite");
            if let Some(kind) = first.attr("kind") {
                cite.set_attr("kind", kind.clone());
            }
            if let Some((label, identifier)) = normalize_label(label) {
                cite.set_attr("label", label);
                cite.set_attr("identifier", identifier);
            }
            cite
        })
        .collect();
    let mut group = Node::parent("citeGroup", cites);
    if let Some(kind) = first_group.attr("kind") {
        group.set_attr("kind", kind.clone());
    }
    Some(group)
}

fn closer(text: &str) -> Option<char> {
    match text.chars().last()? {
        '(' => Some(')'),
        '[' => Some(']'),
        _ => None,
    }
}

fn remove_parentheses(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let Some(children) = n.children.as_mut() else {
            return false;
        };
        let mut dirty = false;
        let mut i = 1;
        while i + 1 < children.len() {
            let close = text_at(children, i - 1).and_then(closer);
            let flanked = children[i].is("citeGroup")
                && close.is_some_and(|c| text_at(children, i + 1).is_some_and(|t| t.starts_with(c)));
            if !flanked {
                i += 1;
                continue;
            }
            if let Some(v) = children[i - 1].value.as_mut() {
                v.pop();
            }
            if let Some(v) = children[i + 1].value.as_mut() {
                v.remove(0);
            }
            let group = &mut children[i];
            group.set_attr("kind", "parenthetical");
            for cite in group.children_mut() {
                cite.set_attr("kind", "parenthetical");
            }
            if value(&children[i + 1]).is_empty() {
                children.remove(i + 1);
            }
            if value(&children[i - 1]).is_empty() {
                children.remove(i - 1);
                i -= 1;
            }
            dirty = true;
            i += 1;
        }
        dirty
    })
}

fn remove_superscript(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let mut dirty = false;
        for child in n.children.iter_mut().flatten() {
            let wraps_group = child.is("superscript")
                && matches!(child.children(), [only] if only.is("citeGroup"));
            if wraps_group {
                if let Some(group) = child.children.take().and_then(|mut c| c.pop()) {
                    *child = group;
                    dirty = true;
                }
            }
        }
        dirty
    })
}

fn space_before_groups(tree: &mut Node) -> bool {
    each_parent(tree, &mut |n: &mut Node| {
        let Some(children) = n.children.as_mut() else {
            return false;
        };
        let mut dirty = false;
        for i in 1..children.len() {
            if !children[i].is("citeGroup") || !children[i - 1].is_text() {
                continue;
            }
            let needs_space = value(&children[i - 1])
                .chars()
                .last()
                .is_some_and(|c| !(c.is_whitespace() || c == '[' || c == '('));
            if needs_space {
                if let Some(v) = children[i - 1].value.as_mut() {
                    v.push(' ');
                    dirty = true;
                }
            }
        }
        dirty
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(label: &str) -> Node {
        Node::parent("cite", vec![Node::text(label)])
            .with_attr("label", label)
            .with_attr("identifier", label)
            .with_attr("kind", "narrative")
    }

    fn para(children: Vec<Node>) -> Node {
        Node::parent("root", vec![Node::parent("paragraph", children)])
    }

    fn order() -> Vec<String> {
        ["a", "b", "c", "d"].map(String::from).to_vec()
    }

    fn labels(group: &Node) -> Vec<&str> {
        group
            .children()
            .iter()
            .filter_map(|c| c.attr_str("label"))
            .collect()
    }

    #[test]
    fn test_comma_separated_cites_merge() {
        let mut tree = para(vec![cite("a"), Node::text(", "), cite("b")]);
        assert!(inline_citations(&mut tree, &order()));
        let p = &tree.children()[0];
        assert_eq!(p.children().len(), 1);
        assert_eq!(p.children()[0].kind, "citeGroup");
        assert_eq!(labels(&p.children()[0]), vec!["a", "b"]);
        assert!(p.find_kind("text").is_none(), "separator and cite text removed");
    }

    #[test]
    fn test_and_separators_merge() {
        for sep in [" and ", ", and ", "; and"] {
            let mut tree = para(vec![cite("a"), Node::text(sep), cite("b")]);
            inline_citations(&mut tree, &order());
            let p = &tree.children()[0];
            assert_eq!(p.children().len(), 1, "separator {sep:?}");
            assert_eq!(labels(&p.children()[0]), vec!["a", "b"]);
            assert_eq!(p.children()[0].attr_str("kind"), Some("narrative"));
        }
    }

    #[test]
    fn test_adjacent_groups_keep_first_kind() {
        let parenthetical = |label: &str| {
            Node::parent("citeGroup", vec![cite(label)]).with_attr("kind", "parenthetical")
        };

        let mut tree = para(vec![cite("a"), parenthetical("b")]);
        inline_citations(&mut tree, &order());
        let group = &tree.children()[0].children()[0];
        assert_eq!(labels(group), vec!["a", "b"]);
        assert_eq!(group.attr_str("kind"), Some("narrative"));

        let mut tree = para(vec![parenthetical("a"), cite("b")]);
        inline_citations(&mut tree, &order());
        let group = &tree.children()[0].children()[0];
        assert_eq!(labels(group), vec!["a", "b"]);
        assert_eq!(group.attr_str("kind"), Some("parenthetical"));
    }

    #[test]
    fn test_separator_merge_blocks_range() {
        let mut tree = para(vec![
            Node::text("see ["),
            cite("a"),
            Node::text(", "),
            cite("b"),
            Node::text("–"),
            cite("d"),
            Node::text("]"),
        ]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        let kinds: Vec<_> = p.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["text", "citeGroup", "text", "citeGroup", "text"]);
        assert_eq!(p.children()[0].value.as_deref(), Some("see ["));
        assert_eq!(labels(&p.children()[1]), vec!["a", "b"]);
        assert_eq!(p.children()[2].value.as_deref().map(str::trim), Some("–"));
        assert_eq!(labels(&p.children()[3]), vec!["d"]);
        assert_eq!(p.children()[4].value.as_deref(), Some("]"));
    }

    #[test]
    fn test_second_run_is_a_fixed_point() {
        let mut tree = para(vec![
            Node::text("As shown ("),
            cite("a"),
            Node::text("; "),
            cite("b"),
            Node::text(") and"),
            Node::parent("superscript", vec![cite("c")]),
        ]);
        inline_citations(&mut tree, &order());
        let once = tree.clone();
        assert!(!inline_citations(&mut tree, &order()));
        assert_eq!(tree, once);
    }

    #[test]
    fn test_range_expands_in_declaration_order() {
        let mut tree = para(vec![cite("a"), Node::text("–"), cite("d")]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        assert_eq!(p.children().len(), 1);
        assert_eq!(labels(&p.children()[0]), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_descending_range_left_alone() {
        let mut tree = para(vec![cite("d"), Node::text("-"), cite("a")]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        let kinds: Vec<_> = p.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["citeGroup", "text", "citeGroup"]);
    }

    #[test]
    fn test_unknown_endpoint_left_alone() {
        let mut tree = para(vec![cite("a"), Node::text(" - "), cite("zz")]);
        inline_citations(&mut tree, &order());
        assert_eq!(tree.children()[0].children().len(), 3);
    }

    #[test]
    fn test_parentheses_consumed() {
        let mut tree = para(vec![Node::text("see ("), cite("a"), Node::text(").")]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        let kinds: Vec<_> = p.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["text", "citeGroup", "text"]);
        assert_eq!(p.children()[0].value.as_deref(), Some("see "));
        assert_eq!(p.children()[2].value.as_deref(), Some("."));
        let group = &p.children()[1];
        assert_eq!(group.attr_str("kind"), Some("parenthetical"));
        assert_eq!(group.children()[0].attr_str("kind"), Some("parenthetical"));
    }

    #[test]
    fn test_brackets_consumed_entirely() {
        let mut tree = para(vec![Node::text("["), cite("a"), Node::text("]")]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        assert_eq!(p.children().len(), 1);
        assert_eq!(p.children()[0].attr_str("kind"), Some("parenthetical"));
    }

    #[test]
    fn test_superscript_lifted_with_space() {
        let mut tree = para(vec![
            Node::text("growth"),
            Node::parent("superscript", vec![cite("a")]),
        ]);
        inline_citations(&mut tree, &order());
        let p = &tree.children()[0];
        assert!(p.find_kind("superscript").is_none());
        assert_eq!(p.children()[0].value.as_deref(), Some("growth "));
        assert_eq!(p.children()[1].kind, "citeGroup");
    }

    #[test]
    fn test_nested_groups_flattened() {
        let mut tree = para(vec![Node::parent(
            "citeGroup",
            vec![Node::parent("citeGroup", vec![cite("a"), cite("b")]), cite("c")],
        )]);
        inline_citations(&mut tree, &order());
        let group = &tree.children()[0].children()[0];
        assert_eq!(labels(group), vec!["a", "b", "c"]);
    }
}
