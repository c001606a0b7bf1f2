//! DOI normalization and basic well-formedness checks.

use std::fmt;

use tracing::trace;

use super::error::DoiError;

/// Resolver prefixes stripped from pasted DOI links.
const DOI_URL_PREFIXES: [&str; 4] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// A single normalized DOI, owned for the duration of one retrieval attempt.
///
/// Only basic well-formedness is enforced: the identifier must be non-empty
/// after trimming and must not contain interior whitespace. Registrant codes
/// and suffix syntax are deliberately not validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoiRequest {
    doi: String,
}

impl DoiRequest {
    /// Normalizes and validates a raw DOI string.
    ///
    /// Strips surrounding whitespace and double quotes, `doi.org` resolver
    /// prefixes, and a case-insensitive `doi:` label.
    ///
    /// # Errors
    ///
    /// Returns [`DoiError::Empty`] when nothing remains, or
    /// [`DoiError::Malformed`] when the identifier contains whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use paper_fetch::parser::DoiRequest;
    ///
    /// let request = DoiRequest::parse(" \"https://doi.org/10.1234/abc\" ").unwrap();
    /// assert_eq!(request.as_str(), "10.1234/abc");
    /// assert!(DoiRequest::parse("   ").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, DoiError> {
        let doi = normalize_doi(raw);
        if doi.is_empty() {
            return Err(DoiError::empty(raw));
        }
        if doi.chars().any(char::is_whitespace) {
            return Err(DoiError::malformed(raw, "DOI contains whitespace"));
        }
        trace!(raw, doi = %doi, "normalized DOI");
        Ok(Self { doi })
    }

    /// The normalized identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.doi
    }

    /// Consumes the request, returning the identifier.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.doi
    }
}

impl fmt::Display for DoiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.doi)
    }
}

fn normalize_doi(raw: &str) -> String {
    let mut doi = raw.trim().trim_matches('"').trim();

    for prefix in DOI_URL_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(doi, prefix) {
            doi = rest;
            break;
        }
    }

    if let Some(rest) = strip_prefix_ignore_case(doi, "doi:") {
        doi = rest;
    }

    doi.trim().to_string()
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_doi_unchanged() {
        let request = DoiRequest::parse("10.1038/s41586-024-07386-0").unwrap();
        assert_eq!(request.as_str(), "10.1038/s41586-024-07386-0");
    }

    #[test]
    fn test_parse_short_registrant_accepted() {
        // No registrant-length validation beyond basic well-formedness
        let request = DoiRequest::parse("10.1/aaa").unwrap();
        assert_eq!(request.as_str(), "10.1/aaa");
    }

    #[test]
    fn test_parse_trims_whitespace_and_quotes() {
        let request = DoiRequest::parse("  \"10.1234/example\"\n").unwrap();
        assert_eq!(request.as_str(), "10.1234/example");
    }

    #[test]
    fn test_parse_strips_resolver_prefixes() {
        for raw in [
            "https://doi.org/10.1234/x",
            "http://doi.org/10.1234/x",
            "https://dx.doi.org/10.1234/x",
            "HTTPS://DOI.ORG/10.1234/x",
        ] {
            assert_eq!(DoiRequest::parse(raw).unwrap().as_str(), "10.1234/x", "{raw}");
        }
    }

    #[test]
    fn test_parse_strips_doi_label() {
        assert_eq!(DoiRequest::parse("DOI: 10.1234/x").unwrap().as_str(), "10.1234/x");
        assert_eq!(DoiRequest::parse("doi:10.1234/x").unwrap().as_str(), "10.1234/x");
    }

    #[test]
    fn test_parse_empty_and_whitespace_rejected() {
        assert!(matches!(DoiRequest::parse(""), Err(DoiError::Empty { .. })));
        assert!(matches!(DoiRequest::parse(" \t\n "), Err(DoiError::Empty { .. })));
        assert!(matches!(DoiRequest::parse("\"\""), Err(DoiError::Empty { .. })));
        assert!(matches!(DoiRequest::parse("doi:"), Err(DoiError::Empty { .. })));
    }

    #[test]
    fn test_parse_interior_whitespace_rejected() {
        let err = DoiRequest::parse("10.1234/a 10.1234/b").unwrap_err();
        assert!(matches!(err, DoiError::Malformed { .. }));
    }

    #[test]
    fn test_display_matches_normalized_value() {
        let request = DoiRequest::parse("doi: 10.5555/abc").unwrap();
        assert_eq!(request.to_string(), "10.5555/abc");
        assert_eq!(request.into_inner(), "10.5555/abc");
    }
}
