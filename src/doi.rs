//! DOI helpers: strip resolver prefixes, validate, and build resolver URLs.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_DOI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").unwrap());

const PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
    "DOI:",
];

/// Bare DOI (`10.xxxx/...`) from a DOI, `doi:` string or resolver URL.
pub fn normalize(input: &str) -> Option<String> {
    let input = input.trim();
    let stripped = PREFIXES
        .iter()
        .find_map(|p| input.strip_prefix(p))
        .unwrap_or(input)
        .trim();
    validate(stripped).then(|| stripped.to_string())
}

pub fn validate(input: &str) -> bool {
    RE_DOI.is_match(input.trim())
}

/// `https://doi.org/<doi>` for any accepted DOI form.
pub fn to_url(input: &str) -> Option<String> {
    normalize(input).map(|d| format!("https://doi.org/{d}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_prefixed() {
        assert_eq!(normalize("10.1000/xyz123").as_deref(), Some("10.1000/xyz123"));
        assert_eq!(
            normalize(" https://doi.org/10.1101/2020.01.01.123 ").as_deref(),
            Some("10.1101/2020.01.01.123")
        );
        assert_eq!(normalize("doi:10.1000/ABC").as_deref(), Some("10.1000/ABC"));
    }

    #[test]
    fn rejects_non_doi() {
        assert!(normalize("PMC12345").is_none());
        assert!(normalize("10.1/x").is_none());
        assert!(!validate("https://example.com"));
    }

    #[test]
    fn url() {
        assert_eq!(
            to_url("10.1000/xyz").as_deref(),
            Some("https://doi.org/10.1000/xyz")
        );
    }
}
