//! # jats2myst
//!
//! Convert JATS journal-article XML into a MyST document tree.
//!
//! JATS nests sections arbitrarily, keeps footnotes and appendices in the
//! back-matter, and marks citations up as cross-references into a
//! bibliography. MyST wants flat blocks with depth-annotated headings,
//! footnote definitions in the body, and citation clusters that point at
//! DOIs or bibliography keys. This crate does that restructuring and reports
//! what it could not convert instead of failing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JATS XML
//!  │
//!  ├─ 1. Parse       quick-xml events → generic tree, JATS accessor
//!  ├─ 2. References  ref-list → DOI / PMID / BibTeX / footnote lookup
//!  ├─ 3. Normalise   back → body, sections → headings + flat blocks
//!  ├─ 4. Emit        JATS elements → MyST nodes (stack-based builder)
//!  ├─ 5. Citations   resolve, group, expand ranges (fixed point)
//!  ├─ 6. Metadata    abbreviations + description → frontmatter
//!  └─ 7. Output      MyST JSON, log, bibliography, myst.yml
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jats2myst::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("article.xml", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.tree)?);
//!     for d in &output.diagnostics.messages {
//!         eprintln!("{}: {}", d.source, d.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For XML already in memory use [`convert_str`]; it does no I/O.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `jats2myst` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! jats2myst = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod doi;
pub mod error;
pub mod frontmatter;
pub mod jats;
pub mod output;
pub mod pipeline;
pub mod tree;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, FrontmatterMode};
pub use convert::{convert, convert_jats, convert_str, convert_sync, convert_to_file, inspect};
pub use error::{Diagnostic, Diagnostics, JatsError, Severity};
pub use frontmatter::Frontmatter;
pub use jats::Jats;
pub use output::{ArticleMetadata, ConversionOutput, ConversionStats, Inspection};
pub use pipeline::math::{BasicMathml, MathmlToLatex};
pub use pmid_cache::{PmidCache, PmidLookup};
pub use tree::{Node, Rewrite};
