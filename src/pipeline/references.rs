//! Reference resolver: classify back-matter `ref` entries and rewrite
//! in-text citations against the result.
//!
//! ## Classification order
//!
//! Each `element-citation` / `mixed-citation` becomes exactly one
//! [`ProcessedReference::Cite`]:
//!
//! 1. an explicit DOI (`pub-id[pub-id-type=doi]` or a DOI-shaped `ext-link`),
//! 2. a DOI-shaped string anywhere in the citation text,
//! 3. a PubMed ID found in the injected PMID → DOI lookup,
//! 4. otherwise a synthesised BibTeX entry keyed by the citation (or ref) id.
//!
//! Steps 1–3 are skipped when DOI citations are disabled. Each `note`
//! becomes a numbered footnote.

use crate::doi;
use crate::error::JatsError;
use crate::jats::Jats;
use crate::tree::{normalize_label, Node};
use once_cell::sync::Lazy;
use pmid_cache::{normalize_pmid, PmidLookup};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// DOI-shaped substring in free citation text.
static RE_DOI_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"10\.[0-9]{4,9}/\S+").unwrap());

/// `, 123.` page number left as bare text in mixed citations.
static RE_LOOSE_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^, [0-9]+\.$").unwrap());

// ── Types ────────────────────────────────────────────────────────────────

/// One resolution of a back-matter citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedReference {
    /// DOI URL or bibliography key.
    Cite(String),
    /// Identifier of a synthesised footnote.
    Footnote(String),
}

/// Identifier → ordered resolutions.
pub type RefLookup = BTreeMap<String, Vec<ProcessedReference>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCounts {
    pub total: usize,
    pub dois: usize,
    pub bibtex: usize,
    pub footnotes: usize,
    pub unprocessed: usize,
}

/// Everything the resolver produced for one document.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    pub lookup: RefLookup,
    /// `fn` nodes synthesised from reference notes, numbered from 1.
    pub footnotes: Vec<Node>,
    /// BibTeX entries, in declaration order.
    pub bibtex: Vec<String>,
    pub counts: ReferenceCounts,
    /// Child element types of `ref` that were not understood (deduplicated).
    pub lost_refs: Vec<String>,
    /// Citation parts that did not map onto a BibTeX field.
    pub lost_items: Vec<String>,
    /// Cite labels in bibliography declaration order, used for range
    /// expansion.
    pub order: Vec<String>,
}

impl ResolvedReferences {
    /// `fn-group` holding the synthesised footnotes, if there are any.
    pub fn footnote_group(&self) -> Option<Node> {
        (!self.footnotes.is_empty()).then(|| Node::parent("fn-group", self.footnotes.clone()))
    }

    /// Contents of the bibliography file (`None` when nothing was synthesised).
    pub fn bibliography(&self) -> Option<String> {
        (!self.bibtex.is_empty()).then(|| self.bibtex.join("\n\n"))
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Classify every back-matter reference of `jats`.
///
/// # Errors
///
/// [`JatsError::MissingRefId`] when a `ref` has no `id`.
pub fn process_references(
    jats: &Jats,
    pmids: &PmidLookup,
    dois: bool,
) -> Result<ResolvedReferences, JatsError> {
    let mut resolver = Resolver {
        pmids,
        dois,
        out: ResolvedReferences::default(),
    };
    for (index, node) in jats.references().into_iter().enumerate() {
        resolver.process_ref(node, index)?;
    }
    resolver.inherit_siblings();
    let mut out = resolver.out;
    out.order = declaration_order(jats, &out.lookup);

    let c = &out.counts;
    info!(
        "References: {} total, {} DOI, {} BibTeX, {} footnotes, {} unprocessed",
        c.total, c.dois, c.bibtex, c.footnotes, c.unprocessed
    );
    if !out.lost_refs.is_empty() {
        debug!("Unprocessed reference parts: {:?}", out.lost_refs);
    }
    Ok(out)
}

/// Classify a single `ref` node (see [`process_references`]).
pub fn process_ref(
    node: &Node,
    index: usize,
    pmids: &PmidLookup,
    dois: bool,
    out: &mut ResolvedReferences,
) -> Result<(), JatsError> {
    let mut resolver = Resolver {
        pmids,
        dois,
        out: std::mem::take(out),
    };
    let result = resolver.process_ref(node, index);
    *out = resolver.out;
    result
}

struct Resolver<'a> {
    pmids: &'a PmidLookup,
    dois: bool,
    out: ResolvedReferences,
}

impl Resolver<'_> {
    fn process_ref(&mut self, node: &Node, index: usize) -> Result<(), JatsError> {
        if !node.is("ref") {
            return Err(JatsError::UnexpectedReferenceType {
                found: node.kind.clone(),
            });
        }
        let ref_id = node
            .attr_str("id")
            .ok_or(JatsError::MissingRefId { index })?;
        self.out.counts.total += 1;

        let mut resolved = Vec::new();
        let mut local_footnotes = Vec::new();
        for child in node.children() {
            match child.kind.as_str() {
                "element-citation" | "mixed-citation" if !child.to_text().trim().is_empty() => {
                    let key = child.attr_str("id").unwrap_or(ref_id);
                    let cite = ProcessedReference::Cite(self.process_cite(child, key));
                    if let Some(id) = child.attr_str("id") {
                        self.out.lookup.insert(id.to_string(), vec![cite.clone()]);
                    }
                    resolved.push(cite);
                }
                "note" => {
                    let id = (self.out.footnotes.len() + local_footnotes.len() + 1).to_string();
                    let mut footnote = child.clone();
                    footnote.kind = "fn".to_string();
                    footnote.set_attr("id", id.as_str());
                    local_footnotes.push(footnote);
                    let note = ProcessedReference::Footnote(id);
                    if let Some(note_id) = child.attr_str("id") {
                        self.out.lookup.insert(note_id.to_string(), vec![note.clone()]);
                    }
                    resolved.push(note);
                }
                "label" => {}
                other => {
                    if !self.out.lost_refs.iter().any(|l| l == other) {
                        self.out.lost_refs.push(other.to_string());
                    }
                }
            }
        }
        self.out.counts.footnotes += local_footnotes.len();
        self.out.footnotes.extend(local_footnotes);
        self.out.lookup.insert(ref_id.to_string(), resolved);
        Ok(())
    }

    /// Resolve one citation to a DOI URL or a BibTeX key.
    fn process_cite(&mut self, cite: &Node, key: &str) -> String {
        if self.dois {
            if let Some(doi) = self.find_doi(cite) {
                self.out.counts.dois += 1;
                return format!("https://doi.org/{doi}");
            }
        }
        let entry = bibtex_from_cite(cite, key);
        match entry.entry {
            Some(text) => {
                self.out.counts.bibtex += 1;
                self.out.bibtex.push(text);
                self.out.lost_items.extend(entry.skipped);
            }
            None => self.out.counts.unprocessed += 1,
        }
        key.to_string()
    }

    fn find_doi(&self, cite: &Node) -> Option<String> {
        let explicit = cite
            .find_all(|n| n.is("ext-link") || n.attr_str("pub-id-type") == Some("doi"))
            .into_iter()
            .find_map(|n| {
                doi::normalize(&n.to_text())
                    .or_else(|| n.attr_str("xlink:href").and_then(doi::normalize))
            });
        if explicit.is_some() {
            return explicit;
        }

        let in_text = cite
            .find_all(Node::is_text)
            .into_iter()
            .filter_map(|n| n.value.as_deref())
            .find_map(|v| RE_DOI_TEXT.find(v))
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ')']).to_string());
        if in_text.is_some() {
            return in_text;
        }

        cite.find_all(|n| n.is("ext-link") || n.attr_str("pub-id-type") == Some("pmid"))
            .into_iter()
            .find_map(|n| {
                let pmid = normalize_pmid(&n.to_text());
                self.pmids.get(&pmid).cloned().flatten()
            })
    }

    /// `ref3` with no resolutions inherits from `ref3a`, `ref3b`, ...
    fn inherit_siblings(&mut self) {
        let empty: Vec<String> = self
            .out
            .lookup
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        for key in empty {
            let inherited: Vec<ProcessedReference> = self
                .out
                .lookup
                .iter()
                .filter(|(k, _)| is_lettered_sibling(&key, k))
                .flat_map(|(_, v)| v.iter().cloned())
                .collect();
            if !inherited.is_empty() {
                debug!("{key} inherits {} resolutions from lettered siblings", inherited.len());
                self.out.lookup.insert(key, inherited);
            }
        }
    }
}

fn is_lettered_sibling(key: &str, candidate: &str) -> bool {
    candidate
        .strip_prefix(key)
        .is_some_and(|rest| rest.len() == 1 && rest.bytes().all(|b| b.is_ascii_lowercase()))
}

/// Resolved cite labels in bibliography order, falling back to the ref id
/// for refs without a citation.
fn declaration_order(jats: &Jats, lookup: &RefLookup) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut push = |label: &str| {
        if !order.iter().any(|o| o == label) {
            order.push(label.to_string());
        }
    };
    for node in jats.references() {
        let Some(id) = node.attr_str("id") else {
            continue;
        };
        let cites: Vec<&str> = lookup
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|r| match r {
                ProcessedReference::Cite(c) => Some(c.as_str()),
                ProcessedReference::Footnote(_) => None,
            })
            .collect();
        if cites.is_empty() {
            push(id);
        }
        for cite in cites {
            push(cite);
        }
    }
    order
}

// ── BibTeX synthesis ─────────────────────────────────────────────────────

/// Result of [`bibtex_from_cite`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BibtexEntry {
    /// Entry text, or `None` when no field could be extracted.
    pub entry: Option<String>,
    /// `key:type -> text` for every part that was not used.
    pub skipped: Vec<String>,
}

fn bibtex_type(publication_type: Option<&str>) -> &'static str {
    match publication_type {
        Some("journal" | "preprint" | "eprint") => "article",
        Some("book") => "book",
        Some("report") => "techreport",
        Some("confproc") => "inproceedings",
        Some("thesis") => "phdthesis",
        _ => "misc",
    }
}

fn field(name: &str, value: impl std::fmt::Display) -> String {
    format!("  {name} = {{{value}}}")
}

fn person_name(node: &Node) -> String {
    match node.kind.as_str() {
        "etal" => "others".to_string(),
        "collab" => format!("{{{}}}", node.to_text().trim()),
        _ => {
            let surname = node.find_kind("surname").map(|n| n.to_text().trim().to_string());
            let given = node
                .find_kind("given-names")
                .map(|n| n.to_text().trim().to_string());
            match (surname, given) {
                (None, None) => node.to_text().trim().to_string(),
                (Some(s), None) => s,
                (None, Some(g)) => g,
                (Some(s), Some(g)) => format!("{s}, {g}"),
            }
        }
    }
}

fn is_person(node: &Node) -> bool {
    matches!(node.kind.as_str(), "name" | "string-name" | "collab" | "etal")
}

/// Build a BibTeX entry from the children of a citation element.
pub fn bibtex_from_cite(cite: &Node, key: &str) -> BibtexEntry {
    let publication_type = cite
        .attr_str("publication-type")
        .or_else(|| cite.attr_str("citation-type"));
    let kind = if cite
        .find(|n| n.is("part-title") || n.is("chapter-title"))
        .is_some()
    {
        "inbook"
    } else {
        bibtex_type(publication_type)
    };
    let is_patent = publication_type == Some("patent");

    let mut lines = vec![format!("@{kind}{{{key}")];
    let mut authors: Vec<String> = Vec::new();
    let mut editors: Vec<String> = Vec::new();
    let mut patent_title: Vec<String> = Vec::new();
    let mut fpage: Option<String> = None;
    let mut lpage: Option<String> = None;
    let mut loose_fpage: Option<String> = None;
    let mut has_title = false;
    let mut skipped = Vec::new();

    for child in cite.children() {
        let text = child.to_text().trim().to_string();
        match child.kind.as_str() {
            "label" | "pub-id" => {}
            "text" if RE_LOOSE_PAGE.is_match(&text) => {
                loose_fpage = Some(text[2..text.len() - 1].to_string());
            }
            "text" if is_patent && text.to_lowercase().contains("patent") => {
                patent_title.insert(0, text);
            }
            // Punctuation and connectives between the fields of a mixed citation.
            "text" => {}
            "article-title" | "part-title" | "chapter-title" | "data-title" => {
                has_title = true;
                lines.push(field("title", text));
            }
            "source" => match kind {
                "book" => {
                    has_title = true;
                    lines.push(field("title", text));
                }
                "inbook" => lines.push(field("booktitle", text)),
                _ => lines.push(field("journal", text)),
            },
            "year" => lines.push(field("year", text)),
            "patent" => patent_title.push(text),
            "issue" => lines.push(field("number", text)),
            "volume" => lines.push(field("volume", text)),
            "conf-name" => lines.push(field("booktitle", text)),
            "institution" => lines.push(field("institution", text)),
            "edition" => lines.push(field("edition", text)),
            "publisher-name" => lines.push(field("publisher", text)),
            "publisher-loc" | "conf-loc" => lines.push(field("address", text)),
            "uri" => {
                let href = child.attr_str("xlink:href").map(str::to_string).unwrap_or(text);
                lines.push(field("howpublished", format!("\\url{{{href}}}")));
            }
            "date-in-citation" => {
                if child.attr_str("content-type") == Some("access-date") {
                    lines.push(field("note", format!("Accessed: {text}")));
                } else {
                    lines.push(field("note", text));
                }
            }
            "fpage" => fpage = Some(text),
            "lpage" => lpage = Some(text),
            "person-group" => {
                let names = child.find_all(is_person).into_iter().map(person_name);
                if child.attr_str("person-group-type") == Some("editor") {
                    editors.extend(names);
                } else {
                    authors.extend(names);
                }
            }
            "name" | "string-name" | "collab" | "etal" => authors.push(person_name(child)),
            other => skipped.push(format!("{key}:{other} -> {text}")),
        }
    }

    if !has_title && !patent_title.is_empty() {
        lines.push(field("title", patent_title.join(" ")));
    }
    if let Some(first) = fpage.or(loose_fpage) {
        match lpage {
            Some(last) => lines.push(field("pages", format!("{first}--{last}"))),
            None => lines.push(field("pages", first)),
        }
    }
    if !authors.is_empty() {
        lines.push(field("author", authors.join(" and ")));
    }
    if !editors.is_empty() {
        lines.push(field("editor", editors.join(" and ")));
    }

    if lines.len() == 1 {
        return BibtexEntry {
            entry: None,
            skipped,
        };
    }
    BibtexEntry {
        entry: Some(format!("{}\n}}", lines.join(",\n"))),
        skipped,
    }
}

// ── Citation rewriting ───────────────────────────────────────────────────

fn lookup_cite<'a>(node: &Node, lookup: &'a RefLookup) -> Option<&'a Vec<ProcessedReference>> {
    node.attr_str("label")
        .and_then(|l| lookup.get(l))
        .or_else(|| node.attr_str("identifier").and_then(|i| lookup.get(i)))
}

fn labelled(kind: &str, value: &str) -> Node {
    let node = Node::leaf(kind);
    match normalize_label(value) {
        Some((label, identifier)) => node
            .with_attr("label", label)
            .with_attr("identifier", identifier),
        None => node,
    }
}

fn expand_resolutions(resolutions: &[ProcessedReference]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cites = Vec::new();
    for r in resolutions {
        match r {
            ProcessedReference::Footnote(id) => out.push(labelled("footnoteReference", id)),
            ProcessedReference::Cite(c) => {
                cites.push(labelled("cite", c).with_attr("kind", "parenthetical"))
            }
        }
    }
    if !cites.is_empty() {
        out.push(Node::parent("citeGroup", cites).with_attr("kind", "parenthetical"));
    }
    out
}

/// Replace every emitted `cite` found in `lookup` by its resolutions.
///
/// Footnote resolutions become `footnoteReference`s; DOI and key
/// resolutions are gathered into one parenthetical `citeGroup`. A cite
/// whose entry resolved to nothing is removed. Nodes produced here are not
/// revisited. Returns the number of cites replaced.
pub fn resolve_citations(tree: &mut Node, lookup: &RefLookup) -> usize {
    let Some(children) = tree.children.take() else {
        return 0;
    };
    let mut replaced = 0;
    let mut out = Vec::with_capacity(children.len());
    for mut child in children {
        if child.is("cite") {
            if let Some(resolutions) = lookup_cite(&child, lookup) {
                out.extend(expand_resolutions(resolutions));
                replaced += 1;
                continue;
            }
        }
        replaced += resolve_citations(&mut child, lookup);
        out.push(child);
    }
    tree.children = Some(out);
    replaced
}

// ── Reference summary ────────────────────────────────────────────────────

/// Short rendering of one bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

/// Per-ref summaries plus the order refs are first cited in the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub order: Vec<String>,
    pub data: BTreeMap<String, ReferenceData>,
}

/// Summarise the bibliography of `jats`.
pub fn reference_summary(jats: &Jats) -> ReferenceSummary {
    let mut summary = ReferenceSummary::default();
    for node in jats.references() {
        let Some(id) = node.attr_str("id") else {
            continue;
        };
        summary.data.insert(id.to_string(), reference_data(node));
    }
    if let Some(body) = jats.body() {
        for xref in body.find_all(|n| n.is("xref") && n.attr_str("ref-type") == Some("bibr")) {
            for rid in xref.attr_str("rid").unwrap_or_default().split_whitespace() {
                if !summary.order.iter().any(|o| o == rid) {
                    summary.order.push(rid.to_string());
                }
            }
        }
    }
    summary
}

fn reference_data(node: &Node) -> ReferenceData {
    let text_of = |kind: &str| {
        node.find_kind(kind)
            .map(|n| n.to_text().trim().to_string())
            .unwrap_or_default()
    };
    let names = node
        .find_all(|n| n.is("name") || n.is("string-name"))
        .into_iter()
        .map(person_name)
        .collect::<Vec<_>>()
        .join(", ");
    let doi = node
        .find_all(|n| n.is("ext-link") || n.attr_str("pub-id-type") == Some("doi"))
        .into_iter()
        .find_map(|n| doi::normalize(&n.to_text()));
    let doi_link = doi
        .as_deref()
        .map(|d| format!(" <a href=https://doi.org/{d}>{d}</a>"))
        .unwrap_or_default();
    let html = format!(
        "{names}. ({}). {}. <i>{}</i>, <i>{}</i>, {}-{}.{doi_link}",
        text_of("year"),
        text_of("article-title"),
        text_of("source"),
        text_of("volume"),
        text_of("fpage"),
        text_of("lpage"),
    );
    ReferenceData { html, doi }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jats(back: &str) -> Jats {
        let xml = format!(
            r#"<article><front/><body><p>See <xref ref-type="bibr" rid="r2">2</xref> and <xref ref-type="bibr" rid="r1">1</xref>.</p></body><back><ref-list>{back}</ref-list></back></article>"#
        );
        Jats::parse(&xml).unwrap()
    }

    const JOURNAL_REF: &str = r#"<ref id="r1"><element-citation publication-type="journal">
        <person-group person-group-type="author"><name><surname>Smith</surname><given-names>J</given-names></name><etal/></person-group>
        <article-title>On cells</article-title><source>Cell Journal</source><year>2020</year>
        <volume>4</volume><fpage>10</fpage><lpage>20</lpage></element-citation></ref>"#;

    #[test]
    fn test_doi_field_takes_priority() {
        let j = jats(
            r#"<ref id="r1"><mixed-citation>Smith J. Title. 2020. 10.9999/other.1
            <pub-id pub-id-type="doi">10.1000/field.1</pub-id></mixed-citation></ref>"#,
        );
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(
            refs.lookup["r1"],
            vec![ProcessedReference::Cite("https://doi.org/10.1000/field.1".into())]
        );
        assert_eq!(refs.counts.dois, 1);
        assert!(refs.bibtex.is_empty());
    }

    #[test]
    fn test_doi_in_text() {
        let j = jats(r#"<ref id="r1"><mixed-citation>Smith J. doi:10.1000/xyz.</mixed-citation></ref>"#);
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(
            refs.lookup["r1"],
            vec![ProcessedReference::Cite("https://doi.org/10.1000/xyz".into())]
        );
    }

    #[test]
    fn test_pmid_resolved_through_lookup() {
        let j = jats(
            r#"<ref id="r1"><element-citation><source>J</source><pub-id pub-id-type="pmid">12345</pub-id></element-citation></ref>"#,
        );
        let pmids = PmidLookup::from([("12345".to_string(), Some("10.1000/pm".to_string()))]);
        let refs = process_references(&j, &pmids, true).unwrap();
        assert_eq!(
            refs.lookup["r1"],
            vec![ProcessedReference::Cite("https://doi.org/10.1000/pm".into())]
        );
    }

    #[test]
    fn test_bibtex_fallback() {
        let j = jats(JOURNAL_REF);
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(refs.lookup["r1"], vec![ProcessedReference::Cite("r1".into())]);
        assert_eq!(refs.counts.bibtex, 1);
        let bib = refs.bibliography().unwrap();
        assert!(bib.starts_with("@article{r1,\n"), "got: {bib}");
        assert!(bib.contains("  title = {On cells}"));
        assert!(bib.contains("  journal = {Cell Journal}"));
        assert!(bib.contains("  pages = {10--20}"));
        assert!(bib.contains("  author = {Smith, J and others}"));
        assert!(bib.ends_with("\n}"));
    }

    #[test]
    fn test_dois_disabled_forces_bibtex() {
        let j = jats(
            r#"<ref id="r1"><element-citation publication-type="journal"><source>J</source><pub-id pub-id-type="doi">10.1000/x1</pub-id></element-citation></ref>"#,
        );
        let refs = process_references(&j, &PmidLookup::new(), false).unwrap();
        assert_eq!(refs.lookup["r1"], vec![ProcessedReference::Cite("r1".into())]);
        assert_eq!(refs.counts.dois, 0);
    }

    #[test]
    fn test_missing_ref_id_is_fatal() {
        let j = jats(r#"<ref><mixed-citation>Anon.</mixed-citation></ref>"#);
        let err = process_references(&j, &PmidLookup::new(), true).unwrap_err();
        assert!(matches!(err, JatsError::MissingRefId { index: 0 }), "got: {err}");
    }

    #[test]
    fn test_unexpected_reference_type() {
        let mut out = ResolvedReferences::default();
        let err = process_ref(&Node::element("note"), 0, &PmidLookup::new(), true, &mut out)
            .unwrap_err();
        assert!(matches!(err, JatsError::UnexpectedReferenceType { .. }));
    }

    #[test]
    fn test_notes_become_numbered_footnotes() {
        let j = jats(
            r#"<ref id="r1"><note id="n1"><p>First.</p></note></ref>
               <ref id="r2"><note><p>Second.</p></note><note><p>Third.</p></note></ref>"#,
        );
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(refs.counts.footnotes, 3);
        assert_eq!(refs.lookup["n1"], vec![ProcessedReference::Footnote("1".into())]);
        assert_eq!(
            refs.lookup["r2"],
            vec![
                ProcessedReference::Footnote("2".into()),
                ProcessedReference::Footnote("3".into())
            ]
        );
        let group = refs.footnote_group().unwrap();
        assert_eq!(group.children()[2].attr_str("id"), Some("3"));
        assert!(group.children().iter().all(|n| n.is("fn")));
    }

    #[test]
    fn test_lettered_siblings_inherit() {
        let j = jats(
            r#"<ref id="r3"><label>3</label></ref>
               <ref id="r3a"><mixed-citation>a 10.1000/a.1</mixed-citation></ref>
               <ref id="r3b"><mixed-citation>b 10.1000/b.1</mixed-citation></ref>"#,
        );
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(refs.lookup["r3"].len(), 2);
    }

    #[test]
    fn test_lost_ref_types_recorded_once() {
        let j = jats(r#"<ref id="r1"><x-other/></ref><ref id="r2"><x-other/></ref>"#);
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(refs.lost_refs, vec!["x-other".to_string()]);
    }

    #[test]
    fn test_citation_punctuation_is_not_lost() {
        let cite = Node::parent(
            "mixed-citation",
            vec![
                Node::parent("source", vec![Node::text("Nature")]),
                Node::text(". "),
                Node::parent("year", vec![Node::text("2001")]),
                Node::text("; see also "),
                Node::parent("comment", vec![Node::text("preprint")]),
            ],
        );
        let entry = bibtex_from_cite(&cite, "r9");
        assert!(entry.entry.is_some());
        assert_eq!(entry.skipped, vec!["r9:comment -> preprint".to_string()]);
    }

    #[test]
    fn test_declaration_order_uses_resolved_labels() {
        let j = jats(
            r#"<ref id="r1"><mixed-citation>10.1000/one.1</mixed-citation></ref><ref id="r2"><label>2</label></ref>"#,
        );
        let refs = process_references(&j, &PmidLookup::new(), true).unwrap();
        assert_eq!(refs.order, vec!["https://doi.org/10.1000/one.1", "r2"]);
    }

    #[test]
    fn test_resolve_citations_replaces_cites() {
        let lookup = RefLookup::from([
            (
                "r1".to_string(),
                vec![
                    ProcessedReference::Footnote("1".into()),
                    ProcessedReference::Cite("https://doi.org/10.1000/x".into()),
                ],
            ),
            ("r2".to_string(), vec![]),
        ]);
        let mut tree = Node::parent(
            "root",
            vec![Node::parent(
                "paragraph",
                vec![
                    Node::leaf("cite").with_attr("label", "r1").with_attr("identifier", "r1"),
                    Node::leaf("cite").with_attr("label", "r2").with_attr("identifier", "r2"),
                    Node::leaf("cite").with_attr("label", "r9").with_attr("identifier", "r9"),
                ],
            )],
        );
        assert_eq!(resolve_citations(&mut tree, &lookup), 2);
        let para = &tree.children()[0];
        let kinds: Vec<_> = para.children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["footnoteReference", "citeGroup", "cite"]);
        let group = &para.children()[1];
        assert_eq!(group.attr_str("kind"), Some("parenthetical"));
        assert_eq!(
            group.children()[0].attr_str("label"),
            Some("https://doi.org/10.1000/x")
        );
    }

    #[test]
    fn test_reference_summary() {
        let j = jats(JOURNAL_REF);
        let summary = reference_summary(&j);
        assert_eq!(summary.order, vec!["r2", "r1"]);
        assert_eq!(
            summary.data["r1"].html,
            "Smith, J. (2020). On cells. <i>Cell Journal</i>, <i>4</i>, 10-20."
        );
        assert!(summary.data["r1"].doi.is_none());
    }
}
