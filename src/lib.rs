//! Paper Fetch Library
//!
//! Batch retrieval of academic papers by DOI. Each DOI is tried against an
//! ordered list of mirrors (a blocked request is re-issued once through a
//! rendering proxy), then against an open-access lookup, and every input ends
//! up as exactly one outcome in an ordered batch result.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - DOI normalization and list parsing
//! - [`download`] - Politeness limiter, filenames and network defaults
//! - [`resolver`] - Transport, mirror chain and open-access fallback
//! - [`outcome`] - Per-DOI outcomes and the batch result
//! - [`batch`] - Orchestration with bounded, order-preserving concurrency
//! - [`package`] - Archive, failure report and summary

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod download;
pub mod outcome;
pub mod package;
pub mod parser;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use batch::{BatchError, BatchObserver, BatchOrchestrator, DoiState, NoopObserver};
pub use download::RateLimiter;
pub use outcome::{BatchResult, ErrorKind, FALLBACK_SOURCE, FailureRecord, FetchOutcome, Retrieved};
pub use package::{BatchSummary, PackageError, failed_dois_text, failure_report, write_archive};
pub use parser::{DoiError, DoiRequest, parse_doi_list};
pub use resolver::{
    DocumentSource, FallbackResolver, FallbackSource, FetchResult, FetchSettings, MirrorChain,
    MirrorConfig, MirrorResolution, ResolveError, SourceClient,
};
