//! Run configuration: the mirror list and network settings.
//!
//! Both are plain values handed to the orchestrator at call time; nothing here
//! is global or mutated during a run.

use std::time::Duration;

use url::Url;

use super::ResolveError;
use crate::download::{CONNECT_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_MS, REQUEST_TIMEOUT_SECS};

/// Maximum number of mirrors consulted per DOI.
pub const MAX_MIRRORS: usize = 3;

/// Mirrors used when none are configured.
pub const DEFAULT_MIRRORS: [&str; 3] = [
    "https://sci-hub.box/",
    "https://sci-hub.se/",
    "https://sci-hub.wf/",
];

/// Rendering proxy used to re-issue a blocked request.
pub const DEFAULT_PROXY_BASE: &str = "https://r.jina.ai/";

/// Default open-access lookup endpoint.
pub const DEFAULT_UNPAYWALL_BASE: &str = "https://api.unpaywall.org";

/// Contact address sent to the lookup API when none is configured.
pub const DEFAULT_UNPAYWALL_EMAIL: &str = "example@example.com";

/// Default number of DOIs processed at once (sequential).
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Ordered mirror base URLs for one run.
///
/// Entries are trimmed, blanks dropped and duplicates removed (first
/// occurrence wins). Any number may be configured, but only the first
/// [`MAX_MIRRORS`] are ever consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    mirrors: Vec<String>,
}

impl MirrorConfig {
    /// Builds a mirror list from user-supplied entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use paper_fetch::resolver::MirrorConfig;
    ///
    /// let config = MirrorConfig::new([" https://a.test/ ", "", "https://a.test/", "https://b.test/"]);
    /// assert_eq!(config.all(), ["https://a.test/", "https://b.test/"]);
    /// ```
    #[must_use]
    pub fn new<I, S>(mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for mirror in mirrors {
            let mirror = mirror.as_ref().trim();
            if mirror.is_empty() || unique.iter().any(|seen| seen == mirror) {
                continue;
            }
            unique.push(mirror.to_string());
        }
        Self { mirrors: unique }
    }

    /// Every configured mirror, in order.
    #[must_use]
    pub fn all(&self) -> &[String] {
        &self.mirrors
    }

    /// The mirrors actually consulted: at most the first [`MAX_MIRRORS`].
    #[must_use]
    pub fn consulted(&self) -> &[String] {
        &self.mirrors[..self.mirrors.len().min(MAX_MIRRORS)]
    }

    /// True when more mirrors are configured than will be consulted.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.mirrors.len() > MAX_MIRRORS
    }

    /// True when no mirror is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Checks that every consulted mirror is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMirror`] for the first unusable entry.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for mirror in self.consulted() {
            validate_http_url(mirror).map_err(|reason| ResolveError::invalid_mirror(mirror, &reason))?;
        }
        Ok(())
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MIRRORS)
    }
}

/// Network and fallback settings shared by every source in a run.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// TCP connect timeout per request.
    pub connect_timeout: Duration,
    /// Total timeout per request, body included.
    pub request_timeout: Duration,
    /// Prefix prepended to a blocked URL for the one-shot bypass.
    pub proxy_base: String,
    /// Minimum spacing between requests to one host (zero disables).
    pub rate_limit: Duration,
    /// Open-access lookup base URL.
    pub unpaywall_base: String,
    /// Contact address for the open-access lookup.
    pub unpaywall_email: String,
    /// Whether the open-access lookup runs after the mirrors are exhausted.
    pub fallback_enabled: bool,
    /// Number of DOIs processed at once.
    pub concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            unpaywall_base: DEFAULT_UNPAYWALL_BASE.to_string(),
            unpaywall_email: DEFAULT_UNPAYWALL_EMAIL.to_string(),
            fallback_enabled: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Returns `Err(reason)` unless `value` parses as an http(s) URL with a host.
pub(crate) fn validate_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("scheme '{}' is not supported", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(url)
}
