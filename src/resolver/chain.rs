//! Ordered mirror chain with first-success short circuit.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{
    DocumentSource, FetchResult, MAX_MIRRORS, MirrorConfig, MirrorSource, ResolveError,
    SourceClient, SourceFailure,
};
use crate::download::suggested_filename;
use crate::outcome::{ErrorKind, Retrieved};

/// Result of walking the mirror chain for one DOI.
#[derive(Debug, Clone)]
pub enum MirrorResolution {
    /// A mirror returned the document.
    Found(Retrieved),
    /// Every consulted mirror failed; one note per mirror, in order.
    Exhausted(Vec<SourceFailure>),
}

/// Mirrors tried in configured order for every DOI.
///
/// At most [`MAX_MIRRORS`] sources are consulted, even when more are
/// registered. The first `Content` wins and later mirrors are not contacted.
pub struct MirrorChain {
    sources: Vec<Box<dyn DocumentSource>>,
}

impl MirrorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Builds the chain for the consulted mirrors of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMirror`] when a consulted mirror is not
    /// an absolute http(s) URL.
    pub fn from_config(
        config: &MirrorConfig,
        client: Arc<SourceClient>,
    ) -> Result<Self, ResolveError> {
        if config.is_truncated() {
            warn!(
                configured = config.all().len(),
                consulted = MAX_MIRRORS,
                "more mirrors configured than are consulted; extra mirrors ignored"
            );
        }
        let mut chain = Self::new();
        for base_url in config.consulted() {
            chain.register(Box::new(MirrorSource::new(base_url, Arc::clone(&client))?));
        }
        Ok(chain)
    }

    /// Appends a source to the chain.
    #[tracing::instrument(skip(self, source), fields(source_name))]
    pub fn register(&mut self, source: Box<dyn DocumentSource>) {
        tracing::Span::current().record("source_name", source.name());
        debug!(position = self.sources.len(), "registering mirror");
        self.sources.push(source);
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Tries each mirror in order until one returns the document.
    #[instrument(skip(self))]
    pub async fn resolve(&self, doi: &str) -> MirrorResolution {
        let mut failures = Vec::new();

        for source in self.sources.iter().take(MAX_MIRRORS) {
            debug!(mirror = source.name(), "trying mirror");
            match source.fetch(doi).await {
                FetchResult::Content(document) => {
                    info!(mirror = source.name(), bytes = document.bytes.len(), "document retrieved");
                    let suggested_name =
                        suggested_filename(doi, document.content_type.as_deref(), &document.url);
                    return MirrorResolution::Found(Retrieved {
                        doi: doi.to_string(),
                        content: document.bytes,
                        suggested_name,
                        source_used: source.name().to_string(),
                        content_type: document.content_type,
                    });
                }
                failed => {
                    let kind = failed.error_kind().unwrap_or(ErrorKind::NotFound);
                    debug!(
                        mirror = source.name(),
                        kind = %kind,
                        detail = failed.detail(),
                        "mirror failed, trying next"
                    );
                    failures.push(SourceFailure {
                        source: source.name().to_string(),
                        kind,
                        detail: failed.detail().to_string(),
                    });
                }
            }
        }

        MirrorResolution::Exhausted(failures)
    }
}

impl Default for MirrorChain {
    fn default() -> Self {
        Self::new()
    }
}
