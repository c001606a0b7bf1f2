//! Input parsing for DOI batches.
//!
//! Uploads arrive as comma-separated text. Newlines are accepted as separators
//! too, so one-DOI-per-line files work without conversion.
//!
//! # Example
//!
//! ```
//! use paper_fetch::parser::parse_doi_list;
//!
//! let dois = parse_doi_list("10.1/aaa, \"10.1/bbb\",\n10.1/ccc,");
//! assert_eq!(dois, vec!["10.1/aaa", "10.1/bbb", "10.1/ccc"]);
//! ```

mod doi;
mod error;

pub use doi::DoiRequest;
pub use error::DoiError;

use tracing::debug;

/// Splits uploaded text into DOI entries, preserving order.
///
/// Entries are trimmed of whitespace and surrounding double quotes. Blank
/// entries (for example from a trailing comma) are dropped here; callers that
/// pass DOIs individually still get an `InvalidDoi` outcome for blank values.
#[must_use]
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse_doi_list(input: &str) -> Vec<String> {
    let entries: Vec<String> = input
        .split([',', '\n'])
        .map(|entry| entry.trim().trim_matches('"').trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();
    debug!(count = entries.len(), "parsed DOI list");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doi_list_comma_separated() {
        assert_eq!(
            parse_doi_list("10.1/a,10.1/b , 10.1/c"),
            vec!["10.1/a", "10.1/b", "10.1/c"]
        );
    }

    #[test]
    fn test_parse_doi_list_accepts_newlines_and_crlf() {
        assert_eq!(
            parse_doi_list("10.1/a\r\n10.1/b\n\n10.1/c"),
            vec!["10.1/a", "10.1/b", "10.1/c"]
        );
    }

    #[test]
    fn test_parse_doi_list_drops_blank_entries() {
        assert_eq!(parse_doi_list(",, ,\"\",10.1/a,"), vec!["10.1/a"]);
        assert!(parse_doi_list("").is_empty());
        assert!(parse_doi_list(" , \n ").is_empty());
    }

    #[test]
    fn test_parse_doi_list_preserves_order_and_duplicates() {
        // No deduplication: each entry yields its own outcome
        assert_eq!(
            parse_doi_list("10.1/b,10.1/a,10.1/b"),
            vec!["10.1/b", "10.1/a", "10.1/b"]
        );
    }
}
