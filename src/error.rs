//! Error types for the jats2myst library.
//!
//! Two distinct kinds of problem reflect two distinct failure modes:
//!
//! * [`JatsError`]: **Fatal**. The conversion cannot proceed at all
//!   (unreadable file, input is not JATS, a back-matter `ref` without an
//!   id). Returned as `Err(JatsError)` from the `convert*` functions.
//!
//! * [`Diagnostic`]: **Non-fatal**. One element could not be converted
//!   (unknown element type, unknown `xref` `ref-type`) but the rest of the
//!   document is fine. Collected in a per-conversion [`Diagnostics`]
//!   accumulator and returned inside [`crate::output::ConversionOutput`]
//!   so callers always get partial output plus a report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// All fatal errors returned by the jats2myst library.
#[derive(Debug, Error)]
pub enum JatsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("JATS file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file could not be read for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not well-formed XML.
    #[error("Problem parsing the JATS document, please ensure it is XML: {detail}")]
    XmlParse { detail: String },

    /// The XML is well-formed but its root is not a single `<article>`.
    #[error("JATS must be structured as <!DOCTYPE><article>...</article>, found root <{root}>")]
    NotJats { root: String },

    // ── Reference errors ──────────────────────────────────────────────────
    /// A back-matter `ref` has no `id`, so citations cannot address it.
    #[error("Encountered \"ref\" without id (reference #{index} in ref-list)")]
    MissingRefId { index: usize },

    /// A node handed to the reference resolver is not a `ref`.
    #[error("Unexpected type for reference: {found}")]
    UnexpectedReferenceType { found: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write one of the output files.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON/YAML serialisation of the result failed.
    #[error("Failed to serialise output: {0}")]
    Serialise(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The on-disk PMID cache could not be read or written.
    #[error(transparent)]
    PmidCache(#[from] pmid_cache::PmidCacheError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How bad a [`Diagnostic`] is. Neither level stops the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal message attached to the converted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Emitting component, e.g. `jats-convert:xref`.
    pub source: String,
    /// Element type of the node the message is about, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

/// Per-conversion accumulator for diagnostics and unhandled element types.
///
/// Threaded through every stage that can report something; nothing is
/// shared between conversions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub messages: Vec<Diagnostic>,
    /// Element types that had no handler during emission.
    pub unhandled: BTreeSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning. `source` is appended to the `jats-convert` prefix.
    pub fn warn(&mut self, message: impl Into<String>, source: Option<&str>, node_type: Option<&str>) {
        self.push(Severity::Warning, message.into(), source, node_type);
    }

    /// Record an error-level message (still non-fatal).
    pub fn error(&mut self, message: impl Into<String>, source: Option<&str>, node_type: Option<&str>) {
        self.push(Severity::Error, message.into(), source, node_type);
    }

    /// Record an element type with no emission handler.
    pub fn unhandled(&mut self, node_type: &str) {
        self.unhandled.insert(node_type.to_string());
        self.error(
            format!("Unhandled JATS conversion for node of \"{node_type}\""),
            None,
            Some(node_type),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, message: String, source: Option<&str>, node_type: Option<&str>) {
        let source = match source {
            Some(s) => format!("jats-convert:{s}"),
            None => "jats-convert".to_string(),
        };
        warn!(target: "jats2myst", "{}: {}", source, message);
        self.messages.push(Diagnostic {
            severity,
            message,
            source,
            node_type: node_type.map(str::to_string),
        });
    }
}
