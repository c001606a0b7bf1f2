//! HTTP transport shared by every mirror.
//!
//! [`SourceClient`] owns status classification, the size-capped body read
//! and the one-shot bypass: a request answered with HTTP 403 is re-issued
//! exactly once through the rendering proxy. It also knows how to turn a
//! mirror landing page into the document it links to.

use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::config::validate_http_url;
use super::http_client::{HttpTimeouts, build_http_client};
use super::utils::{
    absolutize_url, extract_document_link, is_html_placeholder, looks_like_pdf,
    mirror_document_url,
};
use super::{Document, FetchResult, FetchSettings, ResolveError};
use crate::download::{MAX_DOCUMENT_BYTES, RateLimiter};
use crate::user_agent::random_browser_user_agent;

/// Shared HTTP transport for mirror traffic.
///
/// Wrap in `Arc` and share across every mirror and the fallback; the
/// underlying `reqwest::Client` pools connections.
#[derive(Debug)]
pub struct SourceClient {
    client: Client,
    proxy_base: String,
    rate_limiter: Arc<RateLimiter>,
    max_body_bytes: usize,
}

impl SourceClient {
    /// Builds the transport from run settings.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the proxy base is not an http(s) URL or
    /// the HTTP client cannot be built.
    pub fn new(
        settings: &FetchSettings,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, ResolveError> {
        validate_http_url(&settings.proxy_base).map_err(|reason| {
            ResolveError::invalid_endpoint("proxy", &settings.proxy_base, &reason)
        })?;
        let timeouts = HttpTimeouts {
            connect: settings.connect_timeout,
            total: settings.request_timeout,
        };
        let client = build_http_client("mirror", None, timeouts)?;
        let proxy_base = if settings.proxy_base.ends_with('/') {
            settings.proxy_base.clone()
        } else {
            format!("{}/", settings.proxy_base)
        };
        Ok(Self {
            client,
            proxy_base,
            rate_limiter,
            max_body_bytes: MAX_DOCUMENT_BYTES,
        })
    }

    /// Overrides the body size cap.
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// The politeness limiter every request passes through.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// The URL the bypass issues for a blocked `url`.
    #[must_use]
    pub fn proxied_url(&self, url: &str) -> String {
        format!("{}{url}", self.proxy_base)
    }

    /// Sends one GET and classifies the response. No bypass.
    #[instrument(skip(self))]
    pub async fn get(&self, url: &str) -> FetchResult {
        self.send(url, false).await
    }

    /// Sends one GET. A proxied request maps every non-success status to
    /// `NotFound`; only network failures stay `TransientError`.
    async fn send(&self, url: &str, proxied: bool) -> FetchResult {
        self.rate_limiter.acquire(url).await;

        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, random_browser_user_agent())
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                debug!(error = %error, "request timed out");
                return FetchResult::TransientError(format!("timed out fetching {url}"));
            }
            Err(error) => {
                debug!(error = %error, "request failed");
                return FetchResult::TransientError(format!("network error fetching {url}: {error}"));
            }
        };

        let status = response.status();
        if let Some(failure) = classify_status(status) {
            debug!(status = status.as_u16(), proxied, "non-success status");
            if proxied {
                return FetchResult::NotFound(format!(
                    "proxy answered HTTP {} for {url}",
                    status.as_u16()
                ));
            }
            return failure;
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        match read_body(response, self.max_body_bytes).await {
            Ok(bytes) if bytes.is_empty() => FetchResult::NotFound(format!("empty body from {url}")),
            Ok(bytes) => {
                debug!(bytes = bytes.len(), content_type = ?content_type, "body received");
                FetchResult::Content(Document {
                    bytes,
                    content_type,
                    url: final_url,
                })
            }
            Err(failure) => failure,
        }
    }

    /// Sends a GET; on HTTP 403, re-issues it once through the proxy.
    ///
    /// The proxied attempt is never bypassed again: any status failure from
    /// the proxy becomes `NotFound`, a network failure `TransientError`.
    #[instrument(skip(self))]
    pub async fn get_with_bypass(&self, url: &str) -> FetchResult {
        match self.get(url).await {
            FetchResult::Blocked => {
                let proxied = self.proxied_url(url);
                info!(url, proxied = %proxied, "access refused; retrying once through proxy");
                self.send(&proxied, true).await
            }
            other => other,
        }
    }

    /// Retrieves the document for `doi` from the mirror at `base_url`.
    ///
    /// Fetches the landing page, locates the document link and downloads it.
    /// A landing page that already is a PDF is returned as is. A small HTML
    /// body where the document was expected is treated as `NotFound`.
    #[instrument(skip(self), fields(mirror = base_url))]
    pub async fn fetch(&self, base_url: &str, doi: &str) -> FetchResult {
        let landing_url = mirror_document_url(base_url, doi);
        let page = match self.get_with_bypass(&landing_url).await {
            FetchResult::Content(page) => page,
            other => return other,
        };

        if looks_like_pdf(&page.bytes, page.content_type.as_deref()) {
            debug!("landing page is the document");
            return FetchResult::Content(page);
        }

        let text = String::from_utf8_lossy(&page.bytes);
        let Some(link) = extract_document_link(&text) else {
            return FetchResult::NotFound("no document link on landing page".to_string());
        };

        let Some(document_url) = Url::parse(base_url)
            .ok()
            .and_then(|base| absolutize_url(&link, &base))
        else {
            return FetchResult::NotFound(format!("unusable document link '{link}'"));
        };
        debug!(document_url = %document_url, "document link found");

        match self.get_with_bypass(&document_url).await {
            FetchResult::Content(document) => {
                if is_html_placeholder(&document.bytes) {
                    return FetchResult::NotFound(
                        "HTML page returned instead of the document".to_string(),
                    );
                }
                if !looks_like_pdf(&document.bytes, document.content_type.as_deref()) {
                    warn!(
                        document_url = %document_url,
                        content_type = ?document.content_type,
                        "document does not look like a PDF; keeping it"
                    );
                }
                FetchResult::Content(document)
            }
            other => other,
        }
    }
}

/// Maps a response status to a failure; `None` means success.
///
/// 403 is `Blocked`; 429 and 5xx are retryable; every other non-2xx
/// status means the source does not have the document.
pub(crate) fn classify_status(status: StatusCode) -> Option<FetchResult> {
    if status.is_success() {
        return None;
    }
    let code = status.as_u16();
    Some(match code {
        403 => FetchResult::Blocked,
        429 | 500..=599 => FetchResult::TransientError(format!("HTTP {code}")),
        _ => FetchResult::NotFound(format!("HTTP {code}")),
    })
}

async fn read_body(response: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, FetchResult> {
    let too_large = || FetchResult::NotFound(format!("body exceeds {max_bytes} bytes"));

    if let Some(declared) = response.content_length()
        && declared > max_bytes as u64
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| {
            FetchResult::TransientError(format!("body read interrupted: {error}"))
        })?;
        if body.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
