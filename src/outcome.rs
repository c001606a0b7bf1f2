//! Per-DOI outcomes and the ordered batch result.
//!
//! Every input DOI produces exactly one [`FetchOutcome`]: either a retrieved
//! document ([`Retrieved`]) or a [`FailureRecord`] carrying an [`ErrorKind`].

use std::fmt;

/// Source label used for documents obtained through the open-access lookup.
pub const FALLBACK_SOURCE: &str = "fallback-api";

/// Failure taxonomy surfaced in reports.
///
/// `Blocked`, `NotFound` and `TransientError` are source-level kinds. They are
/// absorbed inside the chain and only appear in per-mirror notes; a DOI's
/// terminal failure is one of `InvalidDoi`, `LookupError` or `NotFoundAnywhere`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty or malformed input; no network call was made.
    InvalidDoi,
    /// The source answered HTTP 403.
    Blocked,
    /// The source has no such document.
    NotFound,
    /// Network failure or timeout.
    TransientError,
    /// The open-access lookup was unreachable or answered garbage.
    LookupError,
    /// Every mirror failed and the lookup reported no usable open-access copy.
    NotFoundAnywhere,
}

impl ErrorKind {
    /// Stable label for reports and manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidDoi => "invalid_doi",
            Self::Blocked => "blocked",
            Self::NotFound => "not_found",
            Self::TransientError => "transient_error",
            Self::LookupError => "lookup_error",
            Self::NotFoundAnywhere => "not_found_anywhere",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully retrieved document.
#[derive(Clone, PartialEq, Eq)]
pub struct Retrieved {
    /// Normalized DOI the document belongs to.
    pub doi: String,
    /// Raw document bytes.
    pub content: Vec<u8>,
    /// Filename the packager should use for this document.
    pub suggested_name: String,
    /// Mirror base URL, or [`FALLBACK_SOURCE`].
    pub source_used: String,
    /// Content-Type reported by the server, if any.
    pub content_type: Option<String>,
}

impl fmt::Debug for Retrieved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrieved")
            .field("doi", &self.doi)
            .field("content_len", &self.content.len())
            .field("suggested_name", &self.suggested_name)
            .field("source_used", &self.source_used)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A terminal failure for one DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// The DOI as given (trimmed), possibly empty.
    pub doi: String,
    /// Failure kind.
    pub reason: ErrorKind,
    /// Human-readable detail.
    pub detail: String,
}

impl FailureRecord {
    /// Creates a failure record.
    #[must_use]
    pub fn new(doi: impl Into<String>, reason: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            doi: doi.into(),
            reason,
            detail: detail.into(),
        }
    }
}

/// Terminal outcome for one input DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The document was retrieved.
    Success(Retrieved),
    /// No document could be retrieved.
    Failure(FailureRecord),
}

impl FetchOutcome {
    /// Shorthand for a failure outcome.
    #[must_use]
    pub fn failure(doi: impl Into<String>, reason: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Failure(FailureRecord::new(doi, reason, detail))
    }

    /// Returns true for [`FetchOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// DOI this outcome belongs to.
    #[must_use]
    pub fn doi(&self) -> &str {
        match self {
            Self::Success(retrieved) => &retrieved.doi,
            Self::Failure(record) => &record.doi,
        }
    }

    /// Failure reason, if this is a failure.
    #[must_use]
    pub fn reason(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(record) => Some(record.reason),
        }
    }
}

/// Ordered outcomes of one batch run, one per input DOI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<FetchOutcome>,
}

impl BatchResult {
    /// Wraps outcomes already ordered by input position.
    #[must_use]
    pub fn new(outcomes: Vec<FetchOutcome>) -> Self {
        Self { outcomes }
    }

    /// All outcomes, in input order.
    #[must_use]
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    /// Number of outcomes (equals the number of input DOIs).
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true when the batch had no input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Iterates over retrieved documents in input order.
    pub fn successes(&self) -> impl Iterator<Item = &Retrieved> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FetchOutcome::Success(retrieved) => Some(retrieved),
            FetchOutcome::Failure(_) => None,
        })
    }

    /// Iterates over failures in input order.
    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(record) => Some(record),
        })
    }

    /// Number of successful outcomes.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    /// Number of failed outcomes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Consumes the result, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<FetchOutcome> {
        self.outcomes
    }
}
