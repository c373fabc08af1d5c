//! Conversion entry points.
//!
//! ## Pure vs. path-based
//!
//! [`convert_str`] and [`convert_jats`] take the article in memory and touch
//! no files; the PMID lookup comes from the configuration only. [`convert`]
//! reads the article from disk and falls back to the on-disk PMID cache.
//! [`convert_to_file`] additionally writes the MyST JSON, the conversion
//! log, the bibliography and (in project mode) `myst.yml`.

use crate::config::{ConversionConfig, FrontmatterMode};
use crate::error::{Diagnostics, JatsError};
use crate::jats::Jats;
use crate::output::{
    ArticleMetadata, ConversionOutput, ConversionStats, ElementCounts, Inspection, MathCounts,
};
use crate::pipeline::abbreviations::{abbreviation_footnotes, abbreviation_sections};
use crate::pipeline::abstracts::{abstract_transform, description_from_abstract};
use crate::pipeline::backmatter::{back_to_body, float_to_end};
use crate::pipeline::citations::inline_citations;
use crate::pipeline::emit::emit;
use crate::pipeline::normalize::{
    basic_transformations, citation_to_mixed_citation, journal_transforms,
};
use crate::pipeline::postprocess::clean_tree;
use crate::pipeline::references::{process_references, reference_summary, resolve_citations};
use crate::tree::Node;
use pmid_cache::{normalize_pmid, PmidCache, PmidLookup};
use serde_yaml::{Mapping, Value as Yaml};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert JATS XML text.
///
/// # Errors
/// Returns `Err(JatsError)` only for fatal errors:
/// - The text is not XML, or its root is not a JATS article
/// - A back-matter `ref` has no `id`
///
/// Everything else is reported in `output.diagnostics`.
pub fn convert_str(xml: &str, config: &ConversionConfig) -> Result<ConversionOutput, JatsError> {
    let jats = Jats::parse(xml)?;
    convert_jats(jats, config)
}

/// Convert an already parsed article.
pub fn convert_jats(jats: Jats, config: &ConversionConfig) -> Result<ConversionOutput, JatsError> {
    let empty = PmidLookup::new();
    let pmids = config.pmid_cache.as_ref().unwrap_or(&empty);
    transform(&jats, pmids, config)
}

/// Convert a JATS file.
///
/// When no PMID lookup is configured, the cache under the output directory
/// is loaded if present.
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, JatsError> {
    let path = path.as_ref();
    info!("Starting conversion: {}", path.display());
    let xml = read_input(path).await?;
    let jats = Jats::parse(&xml)?;

    let loaded;
    let pmids = match &config.pmid_cache {
        Some(lookup) => lookup,
        None => {
            loaded = PmidCache::load(&config.output_dir(path))?.into_lookup();
            &loaded
        }
    };
    let output = transform(&jats, pmids, config)?;
    if !output.stats.missing_pmids.is_empty() {
        info!(
            "{} PMIDs have no cached DOI: {}",
            output.stats.missing_pmids.len(),
            output.stats.missing_pmids.join(", ")
        );
    }
    Ok(output)
}

/// Convert a JATS file and write the results next to it (or into
/// `config.dir`).
///
/// Writes `<name>.myst.json`, and depending on the configuration
/// `<name>.log.json`, `<name>.log.yml`, the bibliography file and
/// `myst.yml`. Each file is written atomically (temp file + rename).
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, JatsError> {
    let path = path.as_ref();
    let output = convert(path, config).await?;
    let dir = config.output_dir(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "article".to_string());

    // ── MyST JSON ────────────────────────────────────────────────────────
    let document = match config.frontmatter {
        FrontmatterMode::Page => serde_json::json!({
            "mdast": output.tree,
            "frontmatter": output.frontmatter,
        }),
        FrontmatterMode::Ignore | FrontmatterMode::Project => {
            serde_json::json!({ "mdast": output.tree })
        }
    };
    let json = serde_json::to_string_pretty(&document).map_err(serialise)?;
    let myst_json = dir.join(format!("{stem}.myst.json"));
    write_atomic(&myst_json, &json).await?;
    debug!("Wrote {}", myst_json.display());

    // ── Project frontmatter ──────────────────────────────────────────────
    if config.frontmatter == FrontmatterMode::Project {
        let myst_yml = dir.join("myst.yml");
        let existing = match tokio::fs::read_to_string(&myst_yml).await {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(JatsError::ReadFailed {
                    path: myst_yml,
                    source,
                })
            }
        };
        if existing.is_some() {
            debug!("Merging frontmatter into existing {}", myst_yml.display());
        }
        let yaml = merge_project_frontmatter(existing.as_deref(), &output)?;
        write_atomic(&myst_yml, &yaml).await?;
    }

    // ── Conversion log ───────────────────────────────────────────────────
    if config.write_log {
        let json = serde_json::to_string_pretty(&output.stats).map_err(serialise)?;
        write_atomic(&dir.join(format!("{stem}.log.json")), &json).await?;
        let yaml = serde_yaml::to_string(&output.stats).map_err(serialise)?;
        write_atomic(&dir.join(format!("{stem}.log.yml")), &yaml).await?;
    }

    // ── Bibliography ─────────────────────────────────────────────────────
    if config.write_bibtex {
        if let Some(bibtex) = &output.bibtex {
            let bib = dir.join(&config.bibliography_file);
            if tokio::fs::try_exists(&bib).await.unwrap_or(false) {
                debug!("{} already exists; not overwriting", bib.display());
            } else {
                write_atomic(&bib, bibtex).await?;
                info!("Wrote {} bibliography entries to {}", output.stats.references.bibtex, bib.display());
            }
        }
    }

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, JatsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| JatsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Read article metadata and frontmatter without converting the body.
pub async fn inspect(path: impl AsRef<Path>) -> Result<Inspection, JatsError> {
    let xml = read_input(path.as_ref()).await?;
    let jats = Jats::parse(&xml)?;
    Ok(Inspection {
        metadata: article_metadata(&jats),
        doctype: jats.doctype.clone(),
        reference_count: jats.references().len(),
        frontmatter: jats.frontmatter(),
    })
}

// ── Pipeline ─────────────────────────────────────────────────────────────

fn transform(
    jats: &Jats,
    pmids: &PmidLookup,
    config: &ConversionConfig,
) -> Result<ConversionOutput, JatsError> {
    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();
    let mut frontmatter = jats.frontmatter();

    // ── Step 1: Classify references ──────────────────────────────────────
    let resolved = process_references(jats, pmids, config.dois)?;

    // ── Step 2: Assemble the body ────────────────────────────────────────
    let mut body = jats.body().cloned().unwrap_or_else(|| Node::element("body"));
    if let Some(group) = resolved.footnote_group() {
        body.children_mut().push(group);
    }
    let relocated = back_to_body(&mut body, jats.back());
    let floats = float_to_end(&mut body);
    debug!("Relocated {relocated} back-matter parts and {floats} floating supplements");

    let mut children = Vec::new();
    if let Some(node) = jats.abstract_node() {
        let mut node = node.clone();
        abstract_transform(&mut node);
        children.push(
            Node::parent("block", node.children.unwrap_or_default()).with_attr("part", "abstract"),
        );
    }
    children.extend(body.children.take().unwrap_or_default());
    for group in jats.floats_groups() {
        children.extend(group.children().iter().cloned());
    }
    let mut tree = Node::parent("root", children);

    // ── Step 3: Normalise JATS ───────────────────────────────────────────
    basic_transformations(&mut tree);
    citation_to_mixed_citation(&mut tree);
    journal_transforms(&mut tree, jats);

    // ── Step 4: Emit MyST ────────────────────────────────────────────────
    let mut myst = emit(&tree, &mut diagnostics, config.math.as_ref());
    debug!("Emitted {} top-level nodes", myst.children().len());

    // ── Step 5: Citations ────────────────────────────────────────────────
    let replaced = resolve_citations(&mut myst, &resolved.lookup);
    debug!("Resolved {replaced} citations");
    inline_citations(&mut myst, &resolved.order);

    // ── Step 6: Abbreviations ────────────────────────────────────────────
    abbreviation_sections(&mut myst, &mut frontmatter);
    abbreviation_footnotes(&mut myst, &mut frontmatter);

    // ── Step 7: Cleanup ──────────────────────────────────────────────────
    clean_tree(&mut myst);

    let abstract_text = myst
        .children()
        .iter()
        .find(|n| {
            n.is("block")
                && n.attr("data")
                    .and_then(|d| d.get("part"))
                    .and_then(|p| p.as_str())
                    == Some("abstract")
        })
        .map(Node::to_text);
    if let Some(text) = abstract_text {
        frontmatter.description = Some(description_from_abstract(&text));
    }

    // ── Step 8: Stats ────────────────────────────────────────────────────
    let stats = ConversionStats {
        jats_version: env!("CARGO_PKG_VERSION").to_string(),
        article: article_metadata(jats),
        references: resolved.counts.clone(),
        lost_ref_types: resolved.lost_refs.clone(),
        lost_items: resolved.lost_items.clone(),
        unhandled: diagnostics.unhandled.iter().cloned().collect(),
        missing_pmids: missing_pmids(jats, pmids),
        figures: element_counts(jats, &myst, "fig", |n| container_of(n, "figure")),
        tables: element_counts(jats, &myst, "table-wrap", |n| container_of(n, "table")),
        math: MathCounts {
            inline: element_counts(jats, &myst, "inline-formula", |n| n.is("inlineMath")),
            equations: element_counts(jats, &myst, "disp-formula", |n| n.is("math")),
        },
        footnotes: element_counts(jats, &myst, "fn", |n| n.is("footnoteDefinition")),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    if !diagnostics.is_empty() {
        warn!("Conversion finished with {} diagnostics", diagnostics.len());
    }
    info!(
        "Conversion complete: {} figures, {} tables, {} references, {}ms",
        stats.figures.myst, stats.tables.myst, stats.references.total, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        tree: myst,
        frontmatter,
        references: reference_summary(jats),
        bibtex: resolved.bibliography(),
        diagnostics,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn read_input(path: &Path) -> Result<String, JatsError> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        let path = path.to_path_buf();
        match source.kind() {
            std::io::ErrorKind::NotFound => JatsError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => JatsError::PermissionDenied { path },
            _ => JatsError::ReadFailed { path, source },
        }
    })
}

fn serialise(e: impl std::fmt::Display) -> JatsError {
    JatsError::Serialise(e.to_string())
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), JatsError> {
    let failed = |source| JatsError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path: PathBuf = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    Ok(())
}

const FRESH_PROJECT: &str = "version: 1\nproject: {}\nsite: {}\n";

/// Merge the frontmatter into `myst.yml` text under `project`, keeping
/// every other key. Without an existing file a fresh project is created.
fn merge_project_frontmatter(
    existing: Option<&str>,
    output: &ConversionOutput,
) -> Result<String, JatsError> {
    let fields = match serde_yaml::to_value(&output.frontmatter).map_err(serialise)? {
        Yaml::Mapping(fields) => fields,
        _ => Mapping::new(),
    };
    let mut doc: Yaml = serde_yaml::from_str(existing.unwrap_or(FRESH_PROJECT)).map_err(serialise)?;
    let Some(root) = doc.as_mapping_mut() else {
        return Err(JatsError::Serialise("myst.yml is not a mapping".into()));
    };
    match root.get_mut("project") {
        Some(Yaml::Mapping(project)) => project.extend(fields),
        _ => {
            root.insert("project".into(), Yaml::Mapping(fields));
        }
    }
    serde_yaml::to_string(&doc).map_err(serialise)
}

fn article_metadata(jats: &Jats) -> ArticleMetadata {
    ArticleMetadata {
        publisher: jats.publisher(),
        journal: jats.journal_title(),
        pmid: jats.pmid(),
        pmc: jats.pmc(),
        doi: jats.doi(),
        year: jats.publication_year(),
        license: jats.license(),
    }
}

fn container_of(node: &Node, kind: &str) -> bool {
    node.is("container") && node.attr_str("kind") == Some(kind)
}

fn element_counts(
    jats: &Jats,
    myst: &Node,
    jats_kind: &str,
    myst_pred: impl Fn(&Node) -> bool + Copy,
) -> ElementCounts {
    let in_part = |part: Option<&Node>| part.map_or(0, |p| p.count(|n| n.is(jats_kind)));
    ElementCounts {
        body: in_part(jats.body()),
        back: in_part(jats.back()),
        myst: myst.count(myst_pred),
    }
}

/// PMIDs cited in the bibliography that `pmids` knows nothing about.
fn missing_pmids(jats: &Jats, pmids: &PmidLookup) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for reference in jats.references() {
        for id in reference.find_all(|n| n.attr_str("pub-id-type") == Some("pmid")) {
            let pmid = normalize_pmid(&id.to_text());
            if !pmid.is_empty() && !pmids.contains_key(&pmid) && !missing.contains(&pmid) {
                missing.push(pmid);
            }
        }
    }
    missing
}
