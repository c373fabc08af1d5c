//! Abstract cleanup and `description` extraction.

use crate::pipeline::sections::{section_transform, TitleStyle};
use crate::tree::{lift_where, Node};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A sentence boundary is "<lower-case word>." followed by a capitalised word.
static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?\s[a-z]+\.)\s+([A-Z][A-Za-z]*,?\s.*)$").unwrap());

/// Normalise an `abstract` node in place.
///
/// Inner sections get bold-paragraph titles and are flattened; the abstract's
/// own title is dropped when it just says "Abstract", merged into the first
/// paragraph when one follows, or kept as a paragraph otherwise.
pub fn abstract_transform(node: &mut Node) {
    if node.children().len() == 1 && node.children()[0].is("sec") {
        let sec = node.children_mut().remove(0);
        node.children = sec.children;
    }
    section_transform(node, TitleStyle::Strong);
    lift_where(node, |n| n.is("block"));

    let children = node.children_mut();
    if !children.first().is_some_and(|c| c.is("title")) {
        return;
    }
    if children[0].to_text().trim().to_uppercase() == "ABSTRACT" {
        children.remove(0);
        return;
    }
    if children.get(1).is_some_and(|c| c.is("p")) {
        let title = children.remove(0);
        let para = &mut children[0];
        let mut merged = title.children.unwrap_or_default();
        merged.push(Node::text(" "));
        merged.append(para.children_mut());
        para.children = Some(merged);
    } else {
        children[0].kind = "p".to_string();
    }
}

/// First two sentences of `text`, or all of it when no boundary is found.
pub fn description_from_abstract(text: &str) -> String {
    let text = RE_WS.replace_all(text, " ").trim().to_string();
    let Some(first) = RE_SENTENCE.captures(&text) else {
        return text;
    };
    let sentence1 = &first[1];
    let rest = &first[2];
    let sentence2 = match RE_SENTENCE.captures(rest) {
        Some(second) => second[1].to_string(),
        None => rest.to_string(),
    };
    format!("{sentence1} {sentence2}")
}
