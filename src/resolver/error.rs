//! Error types for building the retrieval chain.
//!
//! Per-DOI retrieval never fails with these: source-level problems are
//! absorbed into outcomes. These errors cover configuration that makes a run
//! impossible, following the What/Suggestion pattern used across the project.

use thiserror::Error;

/// Errors that can occur while constructing sources.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// A mirror base URL cannot be used
    #[error("invalid mirror '{url}': {reason}\n  Suggestion: {suggestion}")]
    InvalidMirror {
        /// The configured base URL
        url: String,
        /// Why it was rejected
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The proxy or lookup base URL cannot be used
    #[error("invalid {component} URL '{url}': {reason}")]
    InvalidEndpoint {
        /// Which endpoint (proxy, lookup)
        component: &'static str,
        /// The configured URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// HTTP client construction failed
    #[error("HTTP client construction failed for {component}: {reason}")]
    ClientBuild {
        /// Which component needed the client
        component: &'static str,
        /// Underlying failure
        reason: String,
    },
}

impl ResolveError {
    /// Creates an `InvalidMirror` error.
    #[must_use]
    pub fn invalid_mirror(url: &str, reason: &str) -> Self {
        Self::InvalidMirror {
            url: url.to_string(),
            reason: reason.to_string(),
            suggestion: "Use an http:// or https:// base URL such as https://sci-hub.se/"
                .to_string(),
        }
    }

    /// Creates an `InvalidEndpoint` error.
    #[must_use]
    pub fn invalid_endpoint(component: &'static str, url: &str, reason: &str) -> Self {
        Self::InvalidEndpoint {
            component,
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(component: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ClientBuild {
            component,
            reason: reason.to_string(),
        }
    }
}
