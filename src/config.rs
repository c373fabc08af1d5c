//! Configuration types for JATS-to-MyST conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The pure entry points
//! ([`crate::convert_str`], [`crate::convert_jats`]) only read the fields that
//! shape the tree; the path-based ones also use the output knobs.
//!
//! # Design choice: builder over constructor
//! Most callers change one or two fields. The builder lets them set only
//! those and rely on documented defaults for the rest.

use crate::error::JatsError;
use crate::pipeline::math::{BasicMathml, MathmlToLatex};
use pmid_cache::PmidLookup;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for a JATS-to-MyST conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use jats2myst::{ConversionConfig, FrontmatterMode};
///
/// let config = ConversionConfig::builder()
///     .frontmatter(FrontmatterMode::Page)
///     .dois(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory for output files and the PMID cache. Default: `None`, which
    /// means the directory of the input file (or `.` for in-memory input).
    pub dir: Option<PathBuf>,

    /// Where the extracted frontmatter goes. Default: [`FrontmatterMode::Ignore`].
    pub frontmatter: FrontmatterMode,

    /// Keep DOI citations for later resolution. Default: true.
    ///
    /// When false every reference becomes a bibliography entry, even if a DOI
    /// is available.
    pub dois: bool,

    /// Write the bibliography file when entries were synthesised and the file
    /// does not already exist. Default: true.
    pub write_bibtex: bool,

    /// File name of the bibliography, relative to [`dir`](Self::dir).
    /// Default: `main.bib`.
    pub bibliography_file: String,

    /// Pre-populated PMID → DOI lookup. When `None`, the on-disk cache in
    /// the output directory is loaded if present.
    pub pmid_cache: Option<PmidLookup>,

    /// Write `<name>.log.json` and `<name>.log.yml`. Default: true.
    pub write_log: bool,

    /// MathML → LaTeX converter. Default: [`BasicMathml`].
    pub math: Arc<dyn MathmlToLatex>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dir: None,
            frontmatter: FrontmatterMode::default(),
            dois: true,
            write_bibtex: true,
            bibliography_file: "main.bib".to_string(),
            pmid_cache: None,
            write_log: true,
            math: Arc::new(BasicMathml),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dir", &self.dir)
            .field("frontmatter", &self.frontmatter)
            .field("dois", &self.dois)
            .field("write_bibtex", &self.write_bibtex)
            .field("bibliography_file", &self.bibliography_file)
            .field("pmid_cache", &self.pmid_cache.as_ref().map(|c| c.len()))
            .field("write_log", &self.write_log)
            .field("math", &"<dyn MathmlToLatex>")
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Output directory for an input at `input`.
    pub fn output_dir(&self, input: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = Some(dir.into());
        self
    }

    pub fn frontmatter(mut self, mode: FrontmatterMode) -> Self {
        self.config.frontmatter = mode;
        self
    }

    pub fn dois(mut self, v: bool) -> Self {
        self.config.dois = v;
        self
    }

    pub fn write_bibtex(mut self, v: bool) -> Self {
        self.config.write_bibtex = v;
        self
    }

    pub fn bibliography_file(mut self, name: impl Into<String>) -> Self {
        self.config.bibliography_file = name.into();
        self
    }

    pub fn pmid_cache(mut self, lookup: PmidLookup) -> Self {
        self.config.pmid_cache = Some(lookup);
        self
    }

    pub fn write_log(mut self, v: bool) -> Self {
        self.config.write_log = v;
        self
    }

    pub fn math(mut self, converter: Arc<dyn MathmlToLatex>) -> Self {
        self.config.math = converter;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, JatsError> {
        let name = self.config.bibliography_file.trim();
        if name.is_empty() {
            return Err(JatsError::InvalidConfig(
                "Bibliography file name must not be empty".into(),
            ));
        }
        if Path::new(name).file_name().is_none() {
            return Err(JatsError::InvalidConfig(format!(
                "Bibliography file name is not a file: '{name}'"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where extracted frontmatter is written by [`crate::convert_to_file`].
///
/// | Mode | Effect |
/// |------|--------|
/// | `Ignore` | Frontmatter is returned but not written (default) |
/// | `Page` | Stored next to the tree in `<name>.myst.json` |
/// | `Project` | Merged into `myst.yml` under `project` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontmatterMode {
    #[default]
    Ignore,
    Page,
    Project,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ConversionConfig::default();
        assert!(c.dois);
        assert!(c.write_bibtex);
        assert!(c.write_log);
        assert_eq!(c.bibliography_file, "main.bib");
        assert_eq!(c.frontmatter, FrontmatterMode::Ignore);
        assert!(c.pmid_cache.is_none());
    }

    #[test]
    fn test_builder_rejects_empty_bibliography() {
        let err = ConversionConfig::builder()
            .bibliography_file("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, JatsError::InvalidConfig(_)));
    }

    #[test]
    fn test_output_dir() {
        let c = ConversionConfig::default();
        assert_eq!(c.output_dir(Path::new("paper.xml")), PathBuf::from("."));
        assert_eq!(
            c.output_dir(Path::new("data/paper.xml")),
            PathBuf::from("data")
        );
        let c = ConversionConfig::builder().dir("out").build().unwrap();
        assert_eq!(c.output_dir(Path::new("data/paper.xml")), PathBuf::from("out"));
    }

    #[test]
    fn test_debug_hides_converter() {
        let text = format!("{:?}", ConversionConfig::default());
        assert!(text.contains("<dyn MathmlToLatex>"));
    }
}
