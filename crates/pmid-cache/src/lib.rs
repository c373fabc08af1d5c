//! # pmid-cache
//!
//! A small on-disk cache mapping PubMed IDs to DOIs, so that repeated JATS
//! conversions in the same project do not need to ask the NIH ID converter
//! about the same references again.
//!
//! ## How it works
//!
//! 1. The cache lives at `{dir}/_build/cache/jats-pmid-doi.json`.
//! 2. [`PmidCache::load`] reads it (an absent file is an empty cache).
//! 3. [`PmidCache::missing`] tells a fetcher which PMIDs are still unknown.
//! 4. Fetched results are merged with [`PmidCache::extend`] and persisted
//!    with [`PmidCache::save`].
//!
//! A `null` value records a PMID that was looked up and has no DOI, so it is
//! not asked for again.
//!
//! This crate never touches the network.
//!
//! ## Environment variable overrides
//!
//! - `JATS_PMID_CACHE_DIR`: use this directory instead of `{dir}/_build/cache`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

// ── Public constants ─────────────────────────────────────────────────────────

/// File name of the cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "jats-pmid-doi.json";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "JATS_PMID_CACHE_DIR";

/// Plain PMID → DOI dictionary, `None` meaning "known to have no DOI".
pub type PmidLookup = HashMap<String, Option<String>>;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by pmid-cache operations.
#[derive(Error, Debug)]
pub enum PmidCacheError {
    /// Could not create or navigate the local cache directory.
    #[error("Cache directory error for '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the cache file failed.
    #[error("Cache file error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a JSON object of strings/nulls.
    #[error("Cache file '{path}' is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ── Paths ────────────────────────────────────────────────────────────────────

/// Directory holding the cache for a project rooted at `dir`.
///
/// `JATS_PMID_CACHE_DIR` takes precedence when set and non-empty.
pub fn cache_dir(dir: &Path) -> PathBuf {
    match std::env::var(CACHE_DIR_ENV) {
        Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
        _ => dir.join("_build").join("cache"),
    }
}

/// Full path of the cache file for a project rooted at `dir`.
pub fn cache_file(dir: &Path) -> PathBuf {
    cache_dir(dir).join(CACHE_FILE_NAME)
}

// ── PMID normalisation ───────────────────────────────────────────────────────

/// Reduce the many spellings of a PubMed ID to the bare number string.
///
/// Handles PubMed URLs (`https://pubmed.ncbi.nlm.nih.gov/12345/`), a
/// `PMID:` prefix, and surrounding whitespace. Anything else is returned
/// trimmed but otherwise untouched.
pub fn normalize_pmid(pmid: &str) -> String {
    let pmid = pmid.trim();
    if let Some(rest) = pmid
        .strip_prefix("https://")
        .or_else(|| pmid.strip_prefix("http://"))
    {
        let path = rest.split_once('/').map(|(_, p)| p).unwrap_or("");
        let id = path.trim_matches('/');
        debug!("Extract {} to {}", pmid, id);
        return id.to_string();
    }
    let lower = pmid.to_ascii_lowercase();
    if lower.starts_with("pmid") {
        return pmid[4..]
            .trim_start_matches([':', ' '])
            .trim()
            .to_string();
    }
    pmid.to_string()
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// In-memory view of the PMID → DOI cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PmidCache {
    entries: PmidLookup,
}

impl PmidCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache for the project rooted at `dir`.
    ///
    /// A missing file yields an empty cache rather than an error.
    pub fn load(dir: &Path) -> Result<Self, PmidCacheError> {
        let path = cache_file(dir);
        if !path.exists() {
            debug!("No PMID cache at {}", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| PmidCacheError::Io {
            path: path.clone(),
            source,
        })?;
        let entries: PmidLookup =
            serde_json::from_str(&raw).map_err(|source| PmidCacheError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!("Loaded {} PMID cache entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Persist the cache for the project rooted at `dir`, creating the cache
    /// directory if needed. Keys are written in sorted order.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, PmidCacheError> {
        let folder = cache_dir(dir);
        std::fs::create_dir_all(&folder).map_err(|source| PmidCacheError::CacheDir {
            path: folder.clone(),
            source,
        })?;
        let path = folder.join(CACHE_FILE_NAME);
        let sorted: BTreeMap<&String, &Option<String>> = self.entries.iter().collect();
        let json = serde_json::to_string_pretty(&sorted).map_err(|source| {
            PmidCacheError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, json).map_err(|source| PmidCacheError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// DOI for `pmid`, if one is known. The PMID is normalised first.
    pub fn doi(&self, pmid: &str) -> Option<&str> {
        self.entries
            .get(&normalize_pmid(pmid))
            .and_then(|doi| doi.as_deref())
            .filter(|doi| !doi.is_empty())
    }

    /// Whether `pmid` has been looked up before (with or without a DOI).
    pub fn contains(&self, pmid: &str) -> bool {
        self.entries.contains_key(&normalize_pmid(pmid))
    }

    /// The subset of `pmids` that has never been looked up, normalised and
    /// deduplicated, in first-seen order.
    pub fn missing<'a, I>(&self, pmids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out: Vec<String> = Vec::new();
        for pmid in pmids {
            let pmid = normalize_pmid(pmid);
            if pmid.is_empty() || self.entries.contains_key(&pmid) || out.contains(&pmid) {
                continue;
            }
            out.push(pmid);
        }
        out
    }

    /// Record one lookup result.
    pub fn insert(&mut self, pmid: &str, doi: Option<String>) {
        self.entries.insert(normalize_pmid(pmid), doi);
    }

    /// Merge fetched results; new values replace old ones.
    pub fn extend(&mut self, lookup: PmidLookup) {
        for (pmid, doi) in lookup {
            self.insert(&pmid, doi);
        }
    }

    /// The underlying dictionary, keyed by normalised PMID.
    pub fn lookup(&self) -> &PmidLookup {
        &self.entries
    }

    pub fn into_lookup(self) -> PmidLookup {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<PmidLookup> for PmidCache {
    fn from(lookup: PmidLookup) -> Self {
        let mut cache = Self::new();
        cache.extend(lookup);
        cache
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_bare_pmid() {
        assert_eq!(normalize_pmid(" 16755624 "), "16755624");
    }

    #[test]
    fn normalize_pubmed_url() {
        assert_eq!(
            normalize_pmid("https://pubmed.ncbi.nlm.nih.gov/16755624/"),
            "16755624"
        );
    }

    #[test]
    fn normalize_pmid_prefix() {
        assert_eq!(normalize_pmid("PMID: 16755624"), "16755624");
        assert_eq!(normalize_pmid("pmid:16755624"), "16755624");
    }

    #[test]
    fn lookup_uses_normalised_key() {
        let mut cache = PmidCache::new();
        cache.insert("16755624", Some("10.1002/cbic.200500559".into()));
        assert_eq!(
            cache.doi("PMID: 16755624"),
            Some("10.1002/cbic.200500559")
        );
    }

    #[test]
    fn null_entry_is_known_but_has_no_doi() {
        let mut cache = PmidCache::new();
        cache.insert("1", None);
        assert!(cache.contains("1"));
        assert_eq!(cache.doi("1"), None);
    }

    #[test]
    fn missing_skips_known_and_duplicates() {
        let mut cache = PmidCache::new();
        cache.insert("1", None);
        let missing = cache.missing(["1", "2", "2", " 3"]);
        assert_eq!(missing, vec!["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = PmidCache::new();
        cache.insert("42", Some("10.1000/xyz".into()));
        cache.insert("43", None);
        let path = cache.save(dir.path()).unwrap();
        assert!(path.ends_with("_build/cache/jats-pmid-doi.json"));

        let loaded = PmidCache::load(dir.path()).unwrap();
        assert_eq!(loaded, cache);
    }

    #[test]
    fn load_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PmidCache::load(dir.path()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("_build").join("cache");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(CACHE_FILE_NAME), "not json").unwrap();
        assert!(matches!(
            PmidCache::load(dir.path()),
            Err(PmidCacheError::Parse { .. })
        ));
    }
}
