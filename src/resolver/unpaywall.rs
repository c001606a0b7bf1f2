//! Open-access fallback backed by the Unpaywall API.
//!
//! Queried only after every mirror failed. The lookup returns open-access
//! locations; their direct file URLs are downloaded in order, without the
//! proxy bypass.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::config::validate_http_url;
use super::http_client::{HttpTimeouts, build_http_client};
use super::utils::{encode_doi_path, is_html_placeholder};
use super::{FallbackSource, FetchResult, FetchSettings, ResolveError, SourceClient};
use crate::download::suggested_filename;
use crate::outcome::{ErrorKind, FALLBACK_SOURCE, FetchOutcome, Retrieved};
use crate::user_agent::default_lookup_user_agent;

/// Lookup response; only the fields used for candidate selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnpaywallResponse {
    /// DOI echoed by the service.
    #[serde(default)]
    pub doi: Option<String>,
    /// Whether any open-access copy is known.
    #[serde(default)]
    pub is_oa: Option<bool>,
    /// Location the service ranks highest.
    #[serde(default)]
    pub best_oa_location: Option<OaLocation>,
    /// Every known location.
    #[serde(default)]
    pub oa_locations: Option<Vec<OaLocation>>,
}

/// One open-access location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OaLocation {
    /// Direct file URL, when the service knows one.
    #[serde(default)]
    pub url_for_pdf: Option<String>,
    /// Landing page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// "publisher" or "repository".
    #[serde(default)]
    pub host_type: Option<String>,
}

impl UnpaywallResponse {
    /// Direct file URLs to try, best location first, without duplicates.
    #[must_use]
    pub fn pdf_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let locations = self
            .best_oa_location
            .iter()
            .chain(self.oa_locations.iter().flatten());
        for location in locations {
            let Some(url) = location.url_for_pdf.as_deref().map(str::trim) else {
                continue;
            };
            if !url.is_empty() && !candidates.iter().any(|seen| seen == url) {
                candidates.push(url.to_string());
            }
        }
        candidates
    }
}

/// Unpaywall-backed [`FallbackSource`].
#[derive(Debug)]
pub struct FallbackResolver {
    client: Client,
    downloader: Arc<SourceClient>,
    base_url: String,
    email: String,
}

impl FallbackResolver {
    /// Creates the fallback from run settings.
    ///
    /// Candidate downloads go through `downloader` (shared timeouts and
    /// politeness) using its plain GET, never the bypass.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the lookup base URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(
        settings: &FetchSettings,
        downloader: Arc<SourceClient>,
    ) -> Result<Self, ResolveError> {
        validate_http_url(&settings.unpaywall_base).map_err(|reason| {
            ResolveError::invalid_endpoint("lookup", &settings.unpaywall_base, &reason)
        })?;
        let timeouts = HttpTimeouts {
            connect: settings.connect_timeout,
            total: settings.request_timeout,
        };
        let user_agent = default_lookup_user_agent();
        let client = build_http_client("lookup", Some(&user_agent), timeouts)?;
        Ok(Self {
            client,
            downloader,
            base_url: settings.unpaywall_base.trim_end_matches('/').to_string(),
            email: settings.unpaywall_email.clone(),
        })
    }

    fn lookup_url(&self, doi: &str) -> String {
        format!(
            "{}/v2/{}?email={}",
            self.base_url,
            encode_doi_path(doi),
            urlencoding::encode(&self.email)
        )
    }

    async fn lookup(&self, doi: &str) -> Result<UnpaywallResponse, FetchOutcome> {
        let url = self.lookup_url(doi);
        self.downloader.rate_limiter().acquire(&url).await;

        let response = self.client.get(&url).send().await.map_err(|error| {
            warn!(error = %error, "open-access lookup unreachable");
            FetchOutcome::failure(
                doi,
                ErrorKind::LookupError,
                format!("open-access lookup unreachable: {error}"),
            )
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchOutcome::failure(
                doi,
                ErrorKind::NotFoundAnywhere,
                "DOI unknown to the open-access lookup",
            ));
        }
        if !status.is_success() {
            return Err(FetchOutcome::failure(
                doi,
                ErrorKind::LookupError,
                format!("open-access lookup returned HTTP {}", status.as_u16()),
            ));
        }

        response.json::<UnpaywallResponse>().await.map_err(|error| {
            FetchOutcome::failure(
                doi,
                ErrorKind::LookupError,
                format!("malformed open-access lookup response: {error}"),
            )
        })
    }
}

#[async_trait]
impl FallbackSource for FallbackResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, doi: &str) -> FetchOutcome {
        let response = match self.lookup(doi).await {
            Ok(response) => response,
            Err(outcome) => return outcome,
        };

        let candidates = response.pdf_candidates();
        if candidates.is_empty() {
            debug!(is_oa = ?response.is_oa, "no open-access file location");
            return FetchOutcome::failure(
                doi,
                ErrorKind::NotFoundAnywhere,
                "no open-access copy reported",
            );
        }

        let mut notes = Vec::new();
        for candidate in &candidates {
            match self.downloader.get(candidate).await {
                FetchResult::Content(document) if !is_html_placeholder(&document.bytes) => {
                    info!(url = %candidate, bytes = document.bytes.len(), "open-access copy retrieved");
                    let suggested_name =
                        suggested_filename(doi, document.content_type.as_deref(), &document.url);
                    return FetchOutcome::Success(Retrieved {
                        doi: doi.to_string(),
                        content: document.bytes,
                        suggested_name,
                        source_used: FALLBACK_SOURCE.to_string(),
                        content_type: document.content_type,
                    });
                }
                FetchResult::Content(_) => {
                    notes.push(format!("{candidate}: HTML page instead of the document"));
                }
                failed => {
                    debug!(url = %candidate, detail = failed.detail(), "open-access candidate failed");
                    notes.push(format!("{candidate}: {}", failed.detail()));
                }
            }
        }

        FetchOutcome::failure(
            doi,
            ErrorKind::NotFoundAnywhere,
            format!("open-access copies could not be downloaded ({})", notes.join("; ")),
        )
    }
}
