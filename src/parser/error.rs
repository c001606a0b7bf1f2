//! Error types for DOI input parsing.

use thiserror::Error;

/// Errors that can occur while turning raw input into a DOI request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoiError {
    /// Nothing left after trimming and prefix stripping
    #[error("invalid DOI '{raw}': DOI is empty\n  Suggestion: Remove blank entries or supply a DOI like 10.1234/example")]
    Empty {
        /// The raw input as received
        raw: String,
    },

    /// Interior whitespace means two identifiers were glued together or a title slipped in
    #[error("invalid DOI '{raw}': {reason}\n  Suggestion: Separate DOIs with commas or newlines")]
    Malformed {
        /// The raw input as received
        raw: String,
        /// Why the DOI was rejected
        reason: String,
    },
}

impl DoiError {
    /// Creates an `Empty` error.
    #[must_use]
    pub fn empty(raw: &str) -> Self {
        Self::Empty {
            raw: raw.to_string(),
        }
    }

    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(raw: &str, reason: &str) -> Self {
        Self::Malformed {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_error_empty_message() {
        let msg = DoiError::empty("   ").to_string();
        assert!(msg.contains("invalid DOI"), "got: {msg}");
        assert!(msg.contains("empty"), "got: {msg}");
        assert!(msg.contains("Suggestion"), "got: {msg}");
    }

    #[test]
    fn test_doi_error_malformed_message() {
        let msg = DoiError::malformed("10.1/a 10.1/b", "contains whitespace").to_string();
        assert!(msg.contains("10.1/a 10.1/b"));
        assert!(msg.contains("contains whitespace"));
    }
}
