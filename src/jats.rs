//! The [`Jats`] accessor: a parsed article tree plus constant-time lookups
//! of the parts the pipeline needs (`front`, `body`, `back`, references) and
//! the bibliographic metadata that feeds [`Frontmatter`] and the conversion
//! statistics.

use crate::doi;
use crate::error::JatsError;
use crate::frontmatter::{Affiliation, Author, Frontmatter, Venue};
use crate::pipeline::input::parse_xml;
use crate::tree::Node;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A parsed JATS article.
#[derive(Debug, Clone)]
pub struct Jats {
    pub doctype: Option<String>,
    /// The `<article>` element.
    pub tree: Node,
}

static RE_ORCID_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)?orcid\.org/").unwrap());
static RE_EDGE_PUNCT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s;,]+").unwrap());
static RE_EDGE_PUNCT_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s;,]+$").unwrap());

impl Jats {
    /// Parse JATS XML text.
    ///
    /// The document root must be `<article>` or a `<pmc-articleset>` holding
    /// exactly one `<article>`.
    pub fn parse(xml: &str) -> Result<Self, JatsError> {
        let parsed = parse_xml(xml)?;
        let mut elements = parsed.elements;
        if elements.len() != 1 {
            return Err(JatsError::NotJats {
                root: elements
                    .iter()
                    .map(|n| n.kind.as_str())
                    .collect::<Vec<_>>()
                    .join("><"),
            });
        }
        let root = elements.remove(0);
        let tree = match root.kind.as_str() {
            "article" => root,
            "pmc-articleset" => {
                let mut articles: Vec<Node> = root
                    .children
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|n| !matches!(n.kind.as_str(), "text" | "comment"))
                    .collect();
                if articles.len() != 1 || articles[0].kind != "article" {
                    return Err(JatsError::NotJats {
                        root: "pmc-articleset".to_string(),
                    });
                }
                articles.remove(0)
            }
            other => {
                return Err(JatsError::NotJats {
                    root: other.to_string(),
                })
            }
        };
        debug!("Parsed JATS article ({} top-level parts)", tree.children().len());
        Ok(Self {
            doctype: parsed.doctype,
            tree,
        })
    }

    /// Wrap an already-built `<article>` tree.
    pub fn from_tree(tree: Node) -> Self {
        Self {
            doctype: None,
            tree,
        }
    }

    // ── Parts ────────────────────────────────────────────────────────────

    pub fn front(&self) -> Option<&Node> {
        self.tree.find_kind("front")
    }

    pub fn body(&self) -> Option<&Node> {
        self.tree.find_kind("body")
    }

    pub fn body_mut(&mut self) -> Option<&mut Node> {
        self.tree.find_mut(|n| n.is("body"))
    }

    pub fn back(&self) -> Option<&Node> {
        self.tree.find_kind("back")
    }

    pub fn back_mut(&mut self) -> Option<&mut Node> {
        self.tree.find_mut(|n| n.is("back"))
    }

    pub fn abstract_node(&self) -> Option<&Node> {
        self.front()?.find_kind("abstract")
    }

    /// All `floats-group` elements in the article.
    pub fn floats_groups(&self) -> Vec<&Node> {
        self.tree.find_all(|n| n.is("floats-group"))
    }

    pub fn ref_list(&self) -> Option<&Node> {
        self.back()?.find_kind("ref-list")
    }

    /// Back-matter `ref` entries in declaration order.
    pub fn references(&self) -> Vec<&Node> {
        match self.ref_list() {
            Some(list) => list.find_all(|n| n.is("ref")),
            None => Vec::new(),
        }
    }

    // ── Identifiers ──────────────────────────────────────────────────────

    pub fn doi(&self) -> Option<String> {
        doi::normalize(&find_article_id(self.front()?, "doi")?)
    }

    pub fn pmid(&self) -> Option<String> {
        find_article_id(self.front()?, "pmid")
    }

    pub fn pmc(&self) -> Option<String> {
        let pmc = find_article_id(self.front()?, "pmc")?;
        let stripped = pmc.strip_prefix("PMC").unwrap_or(&pmc);
        Some(stripped.strip_prefix(':').unwrap_or(stripped).to_string())
    }

    /// `journal-id` text of the given `journal-id-type`.
    pub fn journal_id(&self, id_type: &str) -> Option<String> {
        self.tree
            .find(|n| n.is("journal-id") && n.attr_str("journal-id-type") == Some(id_type))
            .map(Node::to_text)
    }

    pub fn journal_title(&self) -> Option<String> {
        non_empty(self.tree.find_kind("journal-title")?.to_text())
    }

    pub fn publisher(&self) -> Option<String> {
        non_empty(self.tree.find_kind("publisher-name")?.to_text())
    }

    /// Licence URL, `ali:license_ref` text, single link, or licence text.
    pub fn license(&self) -> Option<String> {
        let license = self.tree.find_kind("license")?;
        if let Some(href) = license.attr_str("xlink:href") {
            return Some(href.to_string());
        }
        if let Some(r) = license.find_kind("ali:license_ref") {
            return Some(r.to_text());
        }
        let links = license.find_all(|n| n.is("ext-link"));
        if links.len() == 1 {
            return links[0].attr_str("xlink:href").map(str::to_string);
        }
        non_empty(license.to_text().trim().to_string())
    }

    // ── Dates ────────────────────────────────────────────────────────────

    /// First `pub-date` that carries a day.
    pub fn publication_date(&self) -> Option<&Node> {
        self.front()?
            .find_all(|n| n.is("pub-date"))
            .into_iter()
            .find(|d| d.find_kind("day").is_some())
    }

    /// `date[date-type=<kind>]` in the article history.
    pub fn history_date(&self, kind: &str) -> Option<&Node> {
        self.tree
            .find(|n| n.is("date") && n.attr_str("date-type") == Some(kind))
    }

    pub fn publication_year(&self) -> Option<String> {
        non_empty(self.publication_date()?.find_kind("year")?.to_text())
    }

    // ── Frontmatter ──────────────────────────────────────────────────────

    pub fn frontmatter(&self) -> Frontmatter {
        let Some(front) = self.front() else {
            return Frontmatter::default();
        };
        let title_group = front.find_kind("title-group");
        let text_of = |kind: &str| {
            title_group
                .and_then(|g| g.find_kind(kind))
                .map(|n| n.to_text().trim().to_string())
                .and_then(non_empty)
        };
        let authors = front
            .find_all(|n| n.is("contrib-group"))
            .into_iter()
            .flat_map(|g| g.find_all(|n| n.is("contrib")))
            .filter(|c| matches!(c.attr_str("contrib-type"), None | Some("author")))
            .map(process_contributor)
            .collect();
        let affiliations = front
            .find_all(|n| n.is("aff") && n.attr_str("id").is_some())
            .into_iter()
            .map(process_affiliation)
            .collect();
        let keywords = front
            .find_kind("kwd-group")
            .map(|g| {
                g.find_all(|n| n.is("kwd"))
                    .into_iter()
                    .map(|k| k.to_text().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let subject = front
            .find_kind("article-categories")
            .unwrap_or(front)
            .find_kind("subject")
            .map(|s| s.to_text().trim().to_string());

        Frontmatter {
            title: text_of("article-title"),
            subtitle: text_of("subtitle"),
            short_title: text_of("alt-title"),
            doi: self.doi(),
            date: self.publication_date().and_then(format_date),
            authors,
            affiliations,
            keywords,
            venue: front.find_kind("journal-title").map(|t| Venue {
                title: t.to_text().trim().to_string(),
            }),
            subject,
            description: None,
            abbreviations: Default::default(),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// `[pub-id-type=<kind>]` text, falling back to any DOI-shaped id for `doi`.
fn find_article_id(node: &Node, kind: &str) -> Option<String> {
    if let Some(id) = node.find(|n| n.attr_str("pub-id-type") == Some(kind)) {
        let text = id.to_text().trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }
    if kind != "doi" {
        return None;
    }
    node.find(|n| (n.is("article-id") || n.is("pub-id")) && doi::validate(&n.to_text()))
        .map(|n| n.to_text().trim().to_string())
}

fn process_contributor(contrib: &Node) -> Author {
    let text_of = |kind: &str| {
        contrib
            .find_kind(kind)
            .map(|n| n.to_text().trim().to_string())
            .unwrap_or_default()
    };
    let name = format!("{} {}", text_of("given-names"), text_of("surname"))
        .trim()
        .to_string();
    let orcid = contrib
        .find(|n| n.attr_str("contrib-id-type") == Some("orcid"))
        .map(|n| RE_ORCID_URL.replace(n.to_text().trim(), "").into_owned());
    let affiliations = contrib
        .find_all(|n| n.is("xref") && n.attr_str("ref-type") == Some("aff"))
        .into_iter()
        .filter_map(|x| x.attr_str("rid").map(str::to_string))
        .collect();
    Author {
        name,
        orcid,
        affiliations,
    }
}

fn trim_edges(text: &str) -> Option<String> {
    let text = RE_EDGE_PUNCT_START.replace(text, "");
    let text = RE_EDGE_PUNCT_END.replace(&text, "");
    non_empty(text.into_owned())
}

fn process_affiliation(aff: &Node) -> Affiliation {
    let ror = aff
        .find(|n| n.is("institution-id") && n.attr_str("institution-id-type") == Some("ror"))
        .and_then(|n| trim_edges(&n.to_text()));
    let institutions = aff.find_all(|n| n.is("institution"));
    let department = institutions
        .iter()
        .find(|i| i.attr_str("content-type") == Some("dept"))
        .copied()
        .or_else(|| {
            aff.find(|n| {
                n.is("named-content")
                    && n.attr_str("content-type") == Some("organisation-division")
            })
        })
        .and_then(|n| trim_edges(&n.to_text()));
    let country = aff
        .find_kind("country")
        .or_else(|| {
            aff.find(|n| n.is("named-content") && n.attr_str("content-type") == Some("country"))
        })
        .and_then(|n| trim_edges(&n.to_text()));

    let children: Vec<&Node> = aff.children().iter().filter(|c| !c.is("label")).collect();
    let plain = children
        .iter()
        .all(|c| matches!(c.kind.as_str(), "text" | "institution-wrap" | "institution"));
    let institution = if plain {
        let text: String = children.iter().map(|c| institution_text(c)).collect();
        trim_edges(&text)
    } else {
        institutions
            .iter()
            .find(|i| i.attr_str("content-type") != Some("dept"))
            .and_then(|n| trim_edges(&n.to_text()))
    };

    Affiliation {
        id: aff.attr_str("id").map(str::to_string),
        institution,
        department,
        country,
        ror,
    }
}

/// Text of an institution subtree, skipping `institution-id` elements.
fn institution_text(node: &Node) -> String {
    if node.is("institution-id") {
        return String::new();
    }
    let mut out = node.value.clone().unwrap_or_default();
    for child in node.children() {
        out.push_str(&institution_text(child));
    }
    out
}

const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

/// `(year, month, day)` of a JATS date element; missing parts default to 1.
pub fn date_parts(date: &Node) -> Option<(i32, u32, u32)> {
    if let Some(iso) = date.attr_str("iso-8601-date") {
        let mut parts = iso.trim().splitn(3, '-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next().and_then(|m| m.parse().ok()).unwrap_or(1);
        let day = parts
            .next()
            .and_then(|d| d.get(..2))
            .and_then(|d| d.parse().ok())
            .unwrap_or(1);
        return Some((year, month, day));
    }
    let text_of = |kind: &str| date.find_kind(kind).map(|n| n.to_text().trim().to_string());
    let year: i32 = text_of("year")?.parse().ok().filter(|y| *y != 0)?;
    let month = text_of("month").and_then(|m| {
        m.parse::<u32>().ok().or_else(|| {
            let lower = m.to_lowercase();
            MONTHS.iter().find(|(name, _)| *name == lower).map(|(_, n)| *n)
        })
    });
    let Some(month) = month else {
        return Some((year, 1, 1));
    };
    let day = text_of("day")
        .and_then(|d| d.parse().ok())
        .filter(|d| *d != 0)
        .unwrap_or(1);
    Some((year, month, day))
}

/// `YYYY-MM-DD` for a JATS date element.
pub fn format_date(date: &Node) -> Option<String> {
    let (y, m, d) = date_parts(date)?;
    Some(format!("{y:04}-{m:02}-{d:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<?xml version="1.0"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS" "jats.dtd">
<article>
  <front>
    <journal-meta>
      <journal-id journal-id-type="hwp">biorxiv</journal-id>
      <journal-title-group><journal-title>bioRxiv</journal-title></journal-title-group>
      <publisher><publisher-name>Cold Spring Harbor</publisher-name></publisher>
    </journal-meta>
    <article-meta>
      <article-id pub-id-type="doi">10.1101/2020.01.01.123456</article-id>
      <article-id pub-id-type="pmc">PMC123</article-id>
      <title-group><article-title>A  title</article-title></title-group>
      <contrib-group>
        <contrib contrib-type="author">
          <contrib-id contrib-id-type="orcid">https://orcid.org/0000-0001-2345-6789</contrib-id>
          <name><surname>Curie</surname><given-names>Marie</given-names></name>
          <xref ref-type="aff" rid="a1">1</xref>
        </contrib>
        <contrib contrib-type="editor"><name><surname>Ed</surname></name></contrib>
      </contrib-group>
      <aff id="a1"><label>1</label><institution>University of Paris</institution>, <country>France</country></aff>
      <pub-date pub-type="epub"><year>2019</year></pub-date>
      <pub-date pub-type="ppub"><day>7</day><month>Mar</month><year>2020</year></pub-date>
      <permissions><license xlink:href="http://creativecommons.org/licenses/by/4.0/"/></permissions>
      <kwd-group><kwd>cells</kwd><kwd>lipids</kwd></kwd-group>
    </article-meta>
  </front>
  <body><p>x</p></body>
  <back><ref-list><ref id="r1"/><ref id="r2"/></ref-list></back>
</article>"#;

    #[test]
    fn test_accessors() {
        let jats = Jats::parse(ARTICLE).unwrap();
        assert_eq!(jats.doi().as_deref(), Some("10.1101/2020.01.01.123456"));
        assert_eq!(jats.pmc().as_deref(), Some("123"));
        assert_eq!(jats.pmid(), None);
        assert_eq!(jats.journal_id("hwp").as_deref(), Some("biorxiv"));
        assert_eq!(jats.publisher().as_deref(), Some("Cold Spring Harbor"));
        assert_eq!(
            jats.license().as_deref(),
            Some("http://creativecommons.org/licenses/by/4.0/")
        );
        assert_eq!(jats.publication_year().as_deref(), Some("2020"));
        let ids: Vec<_> = jats
            .references()
            .iter()
            .filter_map(|r| r.attr_str("id"))
            .collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_frontmatter() {
        let fm = Jats::parse(ARTICLE).unwrap().frontmatter();
        assert_eq!(fm.title.as_deref(), Some("A  title"));
        assert_eq!(fm.date.as_deref(), Some("2020-03-07"));
        assert_eq!(fm.authors.len(), 1, "editors excluded");
        assert_eq!(fm.authors[0].name, "Marie Curie");
        assert_eq!(fm.authors[0].orcid.as_deref(), Some("0000-0001-2345-6789"));
        assert_eq!(fm.authors[0].affiliations, vec!["a1".to_string()]);
        assert_eq!(fm.affiliations[0].country.as_deref(), Some("France"));
        assert_eq!(
            fm.affiliations[0].institution.as_deref(),
            Some("University of Paris")
        );
        assert_eq!(fm.keywords, vec!["cells", "lipids"]);
        assert_eq!(fm.venue.map(|v| v.title).as_deref(), Some("bioRxiv"));
    }

    #[test]
    fn test_articleset_unwrapped() {
        let jats = Jats::parse("<pmc-articleset><article><body/></article></pmc-articleset>").unwrap();
        assert_eq!(jats.tree.kind, "article");
    }

    #[test]
    fn test_not_jats() {
        let err = Jats::parse("<html><body/></html>").unwrap_err();
        assert!(matches!(err, JatsError::NotJats { ref root } if root == "html"), "got: {err}");
        assert!(Jats::parse("<pmc-articleset><article/><article/></pmc-articleset>").is_err());
    }

    #[test]
    fn test_iso_date() {
        let date = Node::element("pub-date").with_attr("iso-8601-date", "2021-11-05");
        assert_eq!(format_date(&date).as_deref(), Some("2021-11-05"));
    }
}
