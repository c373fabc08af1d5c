//! Abbreviation extraction into frontmatter.
//!
//! Two sources are recognised in the emitted tree:
//!
//! - a `block` made of exactly a heading "Abbreviations" and one paragraph;
//! - an unreferenced `footnoteDefinition` holding a single paragraph that
//!   starts with "Abbreviations: ".
//!
//! Parsing is all-or-nothing: one malformed entry leaves the source in place
//! and the frontmatter untouched.

use crate::frontmatter::Frontmatter;
use crate::pipeline::postprocess::referenced_footnotes;
use crate::tree::{rewrite, Node, Rewrite};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

static RE_ENTRY_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r";\s*").unwrap());
static RE_PART_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,:]\s*").unwrap());

const FOOTNOTE_PREFIX: &str = "abbreviations: ";

/// Parse `"ACC1, acetyl-CoA carboxylase-1; BHT: butylated hydroxytoluene."`.
///
/// Returns `None` unless every entry splits into exactly an abbreviation
/// (no whitespace) and an expansion.
pub fn parse_abbreviations(text: &str) -> Option<BTreeMap<String, String>> {
    let text = text.trim();
    let text = text.strip_suffix('.').unwrap_or(text);
    let mut found = BTreeMap::new();
    for entry in RE_ENTRY_SEP.split(text) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let parts: Vec<&str> = RE_PART_SEP.split(entry).collect();
        let [abbr, expansion] = parts.as_slice() else {
            return None;
        };
        let (abbr, expansion) = (abbr.trim(), expansion.trim());
        if abbr.is_empty() || expansion.is_empty() || abbr.chars().any(char::is_whitespace) {
            return None;
        }
        found.insert(abbr.to_string(), expansion.to_string());
    }
    (!found.is_empty()).then_some(found)
}

fn is_abbreviation_block(node: &Node) -> bool {
    node.is("block")
        && matches!(
            node.children(),
            [heading, para]
                if heading.is("heading")
                    && para.is("paragraph")
                    && heading.to_text().trim().to_lowercase() == "abbreviations"
        )
}

/// Move "Abbreviations" sections into `frontmatter`. Returns how many
/// blocks were consumed.
pub fn abbreviation_sections(tree: &mut Node, frontmatter: &mut Frontmatter) -> usize {
    let mut consumed = 0;
    rewrite(tree, &mut |n: &mut Node| {
        if !is_abbreviation_block(n) {
            return Rewrite::Keep;
        }
        match parse_abbreviations(&n.children()[1].to_text()) {
            Some(found) => {
                frontmatter.merge_abbreviations(found);
                consumed += 1;
                Rewrite::Remove
            }
            None => Rewrite::Keep,
        }
    });
    if consumed > 0 {
        debug!("Extracted abbreviations from {consumed} section(s)");
    }
    consumed
}

/// Move unreferenced "Abbreviations: ..." footnotes into `frontmatter`.
pub fn abbreviation_footnotes(tree: &mut Node, frontmatter: &mut Frontmatter) -> usize {
    let referenced = referenced_footnotes(tree);
    let mut consumed = 0;
    rewrite(tree, &mut |n: &mut Node| {
        if !n.is("footnoteDefinition")
            || n.attr_str("identifier").is_some_and(|id| referenced.contains(id))
        {
            return Rewrite::Keep;
        }
        let [para] = n.children() else {
            return Rewrite::Keep;
        };
        if !para.is("paragraph") {
            return Rewrite::Keep;
        }
        let text = para.to_text();
        let text = text.trim();
        let prefixed = text
            .get(..FOOTNOTE_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(FOOTNOTE_PREFIX));
        if !prefixed {
            return Rewrite::Keep;
        }
        match parse_abbreviations(&text[FOOTNOTE_PREFIX.len()..]) {
            Some(found) => {
                frontmatter.merge_abbreviations(found);
                consumed += 1;
                Rewrite::Remove
            }
            None => Rewrite::Keep,
        }
    });
    if consumed > 0 {
        debug!("Extracted abbreviations from {consumed} footnote(s)");
    }
    consumed
}
