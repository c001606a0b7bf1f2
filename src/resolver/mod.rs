//! Retrieval pipeline turning a DOI into document bytes.
//!
//! Mirrors are tried first, in order, each through the shared
//! [`SourceClient`] transport (which owns the one-shot proxy bypass). When
//! every mirror fails, an open-access lookup takes over.
//!
//! # Architecture
//!
//! - [`DocumentSource`] - Async trait one mirror implements
//! - [`MirrorSource`] - Mirror base URL bound to the shared transport
//! - [`MirrorChain`] - Ordered mirrors with first-success short circuit
//! - [`FallbackSource`] - Async trait for the after-mirrors lookup
//! - [`FallbackResolver`] - Unpaywall-backed fallback
//! - [`SourceClient`] - HTTP transport, status classification and bypass
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use paper_fetch::download::RateLimiter;
//! use paper_fetch::resolver::{FetchSettings, MirrorChain, MirrorConfig, MirrorResolution, SourceClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = FetchSettings::default();
//! let limiter = Arc::new(RateLimiter::new(settings.rate_limit));
//! let client = Arc::new(SourceClient::new(&settings, limiter)?);
//! let chain = MirrorChain::from_config(&MirrorConfig::default(), client)?;
//!
//! match chain.resolve("10.1038/nature12373").await {
//!     MirrorResolution::Found(doc) => println!("{} via {}", doc.suggested_name, doc.source_used),
//!     MirrorResolution::Exhausted(notes) => println!("{} mirrors failed", notes.len()),
//! }
//! # Ok(())
//! # }
//! ```

mod chain;
mod config;
mod error;
mod http_client;
mod mirror;
mod source_client;
mod unpaywall;
pub mod utils;

pub use chain::{MirrorChain, MirrorResolution};
pub use config::{
    DEFAULT_CONCURRENCY, DEFAULT_MIRRORS, DEFAULT_PROXY_BASE, DEFAULT_UNPAYWALL_BASE,
    DEFAULT_UNPAYWALL_EMAIL, FetchSettings, MAX_MIRRORS, MirrorConfig,
};
pub use error::ResolveError;
pub use http_client::{HttpTimeouts, build_http_client};
pub use mirror::MirrorSource;
pub use source_client::SourceClient;
pub use unpaywall::{FallbackResolver, OaLocation, UnpaywallResponse};

use std::fmt;

use async_trait::async_trait;

use crate::outcome::{ErrorKind, FetchOutcome};

/// A response body fetched from a source.
#[derive(Clone)]
pub struct Document {
    /// Raw body bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` header, if sent.
    pub content_type: Option<String>,
    /// Final URL after redirects.
    pub url: String,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("url", &self.url)
            .finish()
    }
}

/// Result of one source attempt.
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// The document was retrieved.
    Content(Document),
    /// The source refused access (HTTP 403).
    Blocked,
    /// The source does not have the document.
    NotFound(String),
    /// The source could not be reached or answered with a retryable error.
    TransientError(String),
}

impl FetchResult {
    /// Failure classification for a non-content result.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Content(_) => None,
            Self::Blocked => Some(ErrorKind::Blocked),
            Self::NotFound(_) => Some(ErrorKind::NotFound),
            Self::TransientError(_) => Some(ErrorKind::TransientError),
        }
    }

    /// Human-readable detail for a non-content result.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Content(_) => "",
            Self::Blocked => "access refused (HTTP 403)",
            Self::NotFound(detail) | Self::TransientError(detail) => detail,
        }
    }
}

/// One failed mirror attempt, kept for the failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// Source name (mirror base URL).
    pub source: String,
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub detail: String,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.source, self.kind, self.detail)
    }
}

/// Joins mirror failures into a single report detail.
#[must_use]
pub fn describe_failures(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return "no mirrors consulted".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A mirror that can return the document for a DOI.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn DocumentSource>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required for the chain.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Source name reported as `source_used` (the mirror base URL).
    fn name(&self) -> &str;

    /// Attempts to retrieve the document for `doi`.
    ///
    /// Never fails: every problem is folded into the returned [`FetchResult`].
    async fn fetch(&self, doi: &str) -> FetchResult;
}

/// The lookup consulted after every mirror has failed.
///
/// Returns the final outcome for the DOI.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    /// Attempts to retrieve an open-access copy of `doi`.
    async fn resolve(&self, doi: &str) -> FetchOutcome;
}
