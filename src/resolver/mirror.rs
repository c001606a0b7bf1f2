//! A mirror base URL bound to the shared transport.

use std::sync::Arc;

use async_trait::async_trait;

use super::config::validate_http_url;
use super::{DocumentSource, FetchResult, ResolveError, SourceClient};

/// One configured mirror.
#[derive(Debug)]
pub struct MirrorSource {
    base_url: String,
    client: Arc<SourceClient>,
}

impl MirrorSource {
    /// Creates a mirror source for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMirror`] unless `base_url` is an
    /// absolute http(s) URL.
    pub fn new(base_url: &str, client: Arc<SourceClient>) -> Result<Self, ResolveError> {
        let base_url = base_url.trim();
        validate_http_url(base_url).map_err(|reason| ResolveError::invalid_mirror(base_url, &reason))?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// The mirror base URL as configured.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DocumentSource for MirrorSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, doi: &str) -> FetchResult {
        self.client.fetch(&self.base_url, doi).await
    }
}
