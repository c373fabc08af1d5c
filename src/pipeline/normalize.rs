//! Structural normalisation passes applied to the JATS tree before emission.
//!
//! Each pass is a small in-place tree rewrite. [`basic_transformations`]
//! runs the publisher-agnostic ones in a fixed order; publisher-specific
//! fix-ups live in [`journal_transforms`].

use crate::jats::{date_parts, Jats};
use crate::pipeline::sections::{section_transform, TitleStyle};
use crate::tree::{remove_where, rewrite, Node, Rewrite};
use tracing::debug;

/// Inline formatting elements that are dropped when they hold no text.
const INLINE_FORMATTING: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "monospace",
    "sc",
    "sub",
    "sup",
    "strike",
];

// ── Captions ─────────────────────────────────────────────────────────────

/// Hoist `caption > title` to be the first child of its figure or table.
pub fn fig_caption_titles(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if !matches!(node.kind.as_str(), "fig" | "table-wrap") {
            return;
        }
        let mut hoisted = None;
        if let Some(caption) = node.children_mut().iter_mut().find(|c| c.is("caption")) {
            let captions = caption.children_mut();
            if let Some(i) = captions.iter().position(|c| c.is("title")) {
                hoisted = Some(captions.remove(i));
            }
        }
        if let Some(title) = hoisted {
            node.children_mut().insert(0, title);
        }
    });
}

// ── Admonitions ──────────────────────────────────────────────────────────

/// Turn the title of a `boxed-text` into an `admonitionTitle`.
///
/// The title is either the first child after an optional `label`, or the
/// `title` of a leading `caption` (the caption is then replaced by its
/// contents).
pub fn admonitions(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if !node.is("boxed-text") {
            return;
        }
        let children = node.children_mut();
        let start = usize::from(children.first().is_some_and(|c| c.is("label")));
        let Some(first) = children.get_mut(start) else {
            return;
        };
        if first.is("title") {
            first.kind = "admonitionTitle".to_string();
        } else if first.is("caption") && first.first_child().is_some_and(|c| c.is("title")) {
            let mut inner = first.children.take().unwrap_or_default();
            inner[0].kind = "admonitionTitle".to_string();
            children.splice(start..=start, inner);
        }
    });
}

// ── Typography ───────────────────────────────────────────────────────────

/// Drop empty inline formatting and replace line breaks in titles by a space.
pub fn typography(tree: &mut Node) {
    let removed = rewrite(tree, &mut |n: &mut Node| {
        let empty = INLINE_FORMATTING.contains(&n.kind.as_str())
            && n.to_text().is_empty()
            && n.children().iter().all(Node::is_text);
        if empty {
            Rewrite::Remove
        } else {
            Rewrite::Keep
        }
    });
    if removed {
        debug!("typography: removed empty inline formatting");
    }
    tree.walk_mut(&mut |node: &mut Node| {
        if !matches!(node.kind.as_str(), "title" | "article-title" | "heading") {
            return;
        }
        node.walk_mut(&mut |n: &mut Node| {
            if n.is("break") {
                *n = Node::text(" ");
            }
        });
    });
}

// ── Section cleanup ──────────────────────────────────────────────────────

/// Remove a redundant "Data Availability" title inside a data-availability
/// section.
pub fn data_availability(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if node.is("sec") && node.attr_str("sec-type") == Some("data-availability") {
            remove_where(node, |n| {
                n.is("title") && n.to_text().trim().to_lowercase() == "data availability"
            });
        }
    });
}

/// `citation` is the pre-JATS-1.0 spelling of `mixed-citation`.
pub fn citation_to_mixed_citation(tree: &mut Node) {
    tree.walk_mut(&mut |node: &mut Node| {
        if node.is("citation") {
            node.kind = "mixed-citation".to_string();
        }
    });
}

// ── Publisher fix-ups ────────────────────────────────────────────────────

/// Publisher-specific rewrites keyed off the article metadata.
pub fn journal_transforms(tree: &mut Node, jats: &Jats) {
    biorxiv_graphics(tree, jats);
}

/// Point bioRxiv figure and table graphics at the hosted large image.
fn biorxiv_graphics(tree: &mut Node, jats: &Jats) {
    if jats.journal_id("hwp").as_deref().map(str::trim) != Some("biorxiv") {
        return;
    }
    let Some((year, month, day)) = jats.history_date("accepted").and_then(date_parts) else {
        return;
    };
    let slug = jats
        .doi()
        .map(|d| d.split('/').skip(1).collect::<Vec<_>>().join("/"))
        .unwrap_or_default();
    let base = format!("https://www.biorxiv.org/content/biorxiv/early/{year}/{month:02}/{day:02}/{slug}");
    let mut rewritten = 0usize;
    tree.walk_mut(&mut |node: &mut Node| {
        if !matches!(node.kind.as_str(), "fig" | "table-wrap") {
            return;
        }
        let Some(hwp_id) = node.attr_str("hwp:id").map(str::to_string) else {
            return;
        };
        if let Some(graphic) = node.find_mut(|n| n.is("graphic")) {
            graphic.set_attr("xlink:href", format!("{base}/{hwp_id}.large.jpg"));
            rewritten += 1;
        }
    });
    debug!("bioRxiv: rewrote {rewritten} graphic URLs");
}

// ── Ordered pass list ────────────────────────────────────────────────────

/// Run the publisher-agnostic passes over a body tree, in order.
pub fn basic_transformations(tree: &mut Node) {
    data_availability(tree);
    section_transform(tree, TitleStyle::Heading);
    typography(tree);
    admonitions(tree);
    fig_caption_titles(tree);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(text: &str) -> Node {
        Node::parent("title", vec![Node::text(text)])
    }

    #[test]
    fn test_caption_title_hoisted() {
        let mut tree = Node::parent(
            "body",
            vec![Node::parent(
                "fig",
                vec![
                    Node::parent("label", vec![Node::text("Figure 1")]),
                    Node::parent(
                        "caption",
                        vec![title("Growth"), Node::parent("p", vec![Node::text("desc")])],
                    ),
                    Node::element("graphic"),
                ],
            )],
        );
        fig_caption_titles(&mut tree);
        let fig = &tree.children()[0];
        let kinds: Vec<_> = fig.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["title", "label", "caption", "graphic"]);
        assert_eq!(fig.children()[2].children().len(), 1);
    }

    #[test]
    fn test_boxed_text_title_becomes_admonition_title() {
        let mut tree = Node::parent(
            "body",
            vec![
                Node::parent("boxed-text", vec![title("Box 1"), Node::element("p")]),
                Node::parent(
                    "boxed-text",
                    vec![
                        Node::element("label"),
                        Node::parent("caption", vec![title("Box 2"), Node::element("p")]),
                    ],
                ),
            ],
        );
        admonitions(&mut tree);
        assert_eq!(tree.children()[0].children()[0].kind, "admonitionTitle");
        let second: Vec<_> = tree.children()[1]
            .children()
            .iter()
            .map(|n| n.kind.as_str())
            .collect();
        assert_eq!(second, vec!["label", "admonitionTitle", "p"]);
    }

    #[test]
    fn test_typography_cleans_empty_formatting_and_breaks() {
        let mut tree = Node::parent(
            "body",
            vec![
                Node::parent("p", vec![Node::text("a"), Node::element("italic"), Node::text("b")]),
                Node::parent(
                    "title",
                    vec![Node::text("one"), Node::leaf("break"), Node::text("two")],
                ),
                Node::parent("p", vec![Node::parent("bold", vec![Node::element("inline-graphic")])]),
            ],
        );
        typography(&mut tree);
        assert!(tree.find_kind("italic").is_none());
        assert_eq!(tree.children()[1].to_text(), "one two");
        assert!(tree.find_kind("bold").is_some(), "formatting around graphics kept");
    }

    #[test]
    fn test_data_availability_title_removed() {
        let mut tree = Node::parent(
            "body",
            vec![Node::parent(
                "sec",
                vec![title("Data Availability"), Node::element("p")],
            )
            .with_attr("sec-type", "data-availability")],
        );
        data_availability(&mut tree);
        assert!(tree.find_kind("title").is_none());
    }

    #[test]
    fn test_citation_renamed() {
        let mut tree = Node::parent("ref", vec![Node::element("citation")]);
        citation_to_mixed_citation(&mut tree);
        assert!(tree.find_kind("mixed-citation").is_some());
    }

    #[test]
    fn test_biorxiv_graphics_rewritten() {
        let xml = r#"<article><front><journal-meta>
            <journal-id journal-id-type="hwp">biorxiv</journal-id></journal-meta>
            <article-meta><article-id pub-id-type="doi">10.1101/2021.02.03.429000</article-id>
            <history><date date-type="accepted"><day>5</day><month>2</month><year>2021</year></date></history>
            </article-meta></front>
            <body><fig id="F1" hwp:id="F1"><graphic xlink:href="old.tif"/></fig></body></article>"#;
        let jats = Jats::parse(xml).unwrap();
        let mut body = jats.body().unwrap().clone();
        journal_transforms(&mut body, &jats);
        let graphic = body.find_kind("graphic").unwrap();
        assert_eq!(
            graphic.attr_str("xlink:href"),
            Some("https://www.biorxiv.org/content/biorxiv/early/2021/02/05/2021.02.03.429000/F1.large.jpg")
        );
    }
}
