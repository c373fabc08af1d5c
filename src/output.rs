//! Result types returned by the conversion entry points.
//!
//! [`ConversionStats`] doubles as the conversion log: `convert_to_file`
//! writes it verbatim to `<name>.log.json` and `<name>.log.yml`.

use crate::error::Diagnostics;
use crate::frontmatter::Frontmatter;
use crate::pipeline::references::{ReferenceCounts, ReferenceSummary};
use crate::tree::Node;
use serde::{Deserialize, Serialize};

/// Everything produced by converting one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// MyST `root` node.
    pub tree: Node,
    pub frontmatter: Frontmatter,
    /// Reference summaries and first-citation order.
    pub references: ReferenceSummary,
    /// Synthesised bibliography file contents, if any entry was synthesised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibtex: Option<String>,
    pub diagnostics: Diagnostics,
    pub stats: ConversionStats,
}

/// Counts of one element kind in the JATS body, the JATS back-matter and the
/// emitted tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub body: usize,
    pub back: usize,
    pub myst: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathCounts {
    pub inline: ElementCounts,
    pub equations: ElementCounts,
}

/// Bibliographic identifiers of the article, read straight from the JATS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub publisher: Option<String>,
    pub journal: Option<String>,
    pub pmid: Option<String>,
    pub pmc: Option<String>,
    pub doi: Option<String>,
    pub year: Option<String>,
    pub license: Option<String>,
}

/// Result of [`crate::inspect`]: metadata only, nothing converted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    #[serde(flatten)]
    pub metadata: ArticleMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    pub reference_count: usize,
    pub frontmatter: Frontmatter,
}

/// Article metadata and conversion counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub jats_version: String,
    #[serde(flatten)]
    pub article: ArticleMetadata,

    pub references: ReferenceCounts,
    /// `ref` child types the resolver did not understand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lost_ref_types: Vec<String>,
    /// Citation parts that did not map onto a bibliography field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lost_items: Vec<String>,
    /// Element types the emitter had no handler for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unhandled: Vec<String>,
    /// PMIDs cited by the article that the lookup had no entry for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_pmids: Vec<String>,

    pub figures: ElementCounts,
    pub tables: ElementCounts,
    pub math: MathCounts,
    pub footnotes: ElementCounts,

    pub total_duration_ms: u64,
}
