//! Batch orchestration: one outcome per input DOI, in input order.
//!
//! Each DOI walks a small state machine:
//!
//! ```text
//! Pending -> TryingMirrors -> Resolved
//!                          -> TryingFallback -> Resolved | Failed
//! ```
//!
//! Invalid input fails straight from `Pending` without a network call.
//! DOIs are processed with bounded concurrency through an ordered buffered
//! stream, so outcomes line up with their inputs without locking. The
//! orchestrator never touches the filesystem; packaging is the caller's job.
//!
//! # Example
//!
//! ```no_run
//! use paper_fetch::batch::BatchOrchestrator;
//! use paper_fetch::resolver::{FetchSettings, MirrorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = BatchOrchestrator::new(&FetchSettings::default())?;
//! let result = orchestrator
//!     .run(&["10.1038/nature12373", "10.1126/science.1157784"], &MirrorConfig::default())
//!     .await?;
//! println!("{} of {} retrieved", result.success_count(), result.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::download::RateLimiter;
use crate::outcome::{BatchResult, ErrorKind, FetchOutcome};
use crate::parser::DoiRequest;
use crate::resolver::{
    FallbackResolver, FallbackSource, FetchSettings, MirrorChain, MirrorConfig, MirrorResolution,
    ResolveError, SourceClient, describe_failures,
};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 32;

/// Errors that prevent a batch from running at all.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No mirror is configured and the fallback is disabled.
    #[error(
        "no sources configured: mirror list is empty and the open-access fallback is disabled\n  Suggestion: Add a --mirror URL or drop --no-fallback"
    )]
    NoSources,

    /// Concurrency outside the supported range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// A mirror, proxy or lookup endpoint could not be set up.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Per-DOI processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoiState {
    /// Not yet started.
    Pending,
    /// Walking the mirror chain.
    TryingMirrors,
    /// Every mirror failed; consulting the open-access lookup.
    TryingFallback,
    /// Document retrieved.
    Resolved,
    /// Terminal failure.
    Failed,
}

impl DoiState {
    /// True for `Resolved` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

impl fmt::Display for DoiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::TryingMirrors => "trying_mirrors",
            Self::TryingFallback => "trying_fallback",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Receives per-DOI progress callbacks.
///
/// Callbacks may arrive from several DOIs interleaved when concurrency is
/// above one; `index` is the DOI's input position.
pub trait BatchObserver: Send + Sync {
    /// A DOI started processing.
    fn on_start(&self, _index: usize, _doi: &str) {}

    /// A DOI moved to a new state.
    fn on_state(&self, _index: usize, _doi: &str, _state: DoiState) {}

    /// A DOI reached its terminal outcome.
    fn on_finish(&self, _index: usize, _outcome: &FetchOutcome) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Drives every DOI through the mirror chain and the fallback.
pub struct BatchOrchestrator {
    client: Arc<SourceClient>,
    fallback: Option<Arc<dyn FallbackSource>>,
    concurrency: usize,
    observer: Arc<dyn BatchObserver>,
}

impl BatchOrchestrator {
    /// Builds the transport, limiter and fallback from run settings.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] when concurrency is out of range or an
    /// endpoint is unusable.
    pub fn new(settings: &FetchSettings) -> Result<Self, BatchError> {
        validate_concurrency(settings.concurrency)?;
        let limiter = Arc::new(RateLimiter::new(settings.rate_limit));
        let client = Arc::new(SourceClient::new(settings, limiter)?);
        let fallback: Option<Arc<dyn FallbackSource>> = if settings.fallback_enabled {
            Some(Arc::new(FallbackResolver::new(settings, Arc::clone(&client))?))
        } else {
            None
        };
        Ok(Self::from_parts(client, fallback).with_concurrency(settings.concurrency))
    }

    /// Assembles an orchestrator from prebuilt parts.
    #[must_use]
    pub fn from_parts(
        client: Arc<SourceClient>,
        fallback: Option<Arc<dyn FallbackSource>>,
    ) -> Self {
        Self {
            client,
            fallback,
            concurrency: MIN_CONCURRENCY,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Sets how many DOIs are processed at once (clamped to the supported range).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        self
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Whether the open-access fallback is configured.
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Processes every DOI against `mirrors`, returning outcomes in input order.
    ///
    /// Individual DOI failures never abort the batch.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::NoSources`] when no mirror is configured and the
    /// fallback is disabled, or [`BatchError::Resolve`] for an unusable
    /// mirror URL. Both are detected before any network call.
    #[instrument(skip(self, dois, mirrors), fields(count = dois.len(), mirrors = mirrors.consulted().len()))]
    pub async fn run<S>(
        &self,
        dois: &[S],
        mirrors: &MirrorConfig,
    ) -> Result<BatchResult, BatchError>
    where
        S: AsRef<str> + Sync,
    {
        if mirrors.is_empty() && self.fallback.is_none() {
            return Err(BatchError::NoSources);
        }
        let chain = MirrorChain::from_config(mirrors, Arc::clone(&self.client))?;
        Ok(self.run_with_chain(dois, &chain).await)
    }

    /// Processes every DOI against a prebuilt chain.
    pub async fn run_with_chain<S>(&self, dois: &[S], chain: &MirrorChain) -> BatchResult
    where
        S: AsRef<str> + Sync,
    {
        info!(count = dois.len(), concurrency = self.concurrency, "starting batch");
        let outcomes: Vec<FetchOutcome> = stream::iter(dois.iter().enumerate())
            .map(|(index, raw)| self.process_one(index, raw.as_ref(), chain))
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = BatchResult::new(outcomes);
        info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "batch complete"
        );
        result
    }

    #[instrument(skip(self, chain))]
    async fn process_one(&self, index: usize, raw: &str, chain: &MirrorChain) -> FetchOutcome {
        self.observer.on_start(index, raw);
        let outcome = self.resolve_doi(index, raw, chain).await;
        let terminal = if outcome.is_success() {
            DoiState::Resolved
        } else {
            DoiState::Failed
        };
        self.transition(index, outcome.doi(), terminal);
        self.observer.on_finish(index, &outcome);
        outcome
    }

    async fn resolve_doi(&self, index: usize, raw: &str, chain: &MirrorChain) -> FetchOutcome {
        let request = match DoiRequest::parse(raw) {
            Ok(request) => request,
            Err(error) => {
                debug!(error = %error, "rejecting input without network call");
                return FetchOutcome::failure(raw.trim(), ErrorKind::InvalidDoi, error.to_string());
            }
        };
        let doi = request.as_str();

        self.transition(index, doi, DoiState::TryingMirrors);
        let notes = match chain.resolve(doi).await {
            MirrorResolution::Found(retrieved) => return FetchOutcome::Success(retrieved),
            MirrorResolution::Exhausted(notes) => notes,
        };
        let mirror_detail = describe_failures(&notes);

        let Some(fallback) = &self.fallback else {
            return FetchOutcome::failure(
                doi,
                ErrorKind::NotFoundAnywhere,
                format!("all mirrors failed: {mirror_detail}"),
            );
        };

        self.transition(index, doi, DoiState::TryingFallback);
        match fallback.resolve(doi).await {
            FetchOutcome::Failure(mut record) => {
                if !notes.is_empty() {
                    record.detail = format!("{}; mirrors: {mirror_detail}", record.detail);
                }
                warn!(doi, reason = %record.reason, "no copy found");
                FetchOutcome::Failure(record)
            }
            success => success,
        }
    }

    fn transition(&self, index: usize, doi: &str, state: DoiState) {
        debug!(index, doi, state = %state, "state transition");
        self.observer.on_state(index, doi, state);
    }
}

/// Validates a concurrency setting.
///
/// # Errors
///
/// Returns [`BatchError::InvalidConcurrency`] outside
/// [`MIN_CONCURRENCY`]..=[`MAX_CONCURRENCY`].
pub fn validate_concurrency(value: usize) -> Result<(), BatchError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(())
    } else {
        Err(BatchError::InvalidConcurrency { value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::outcome::{FALLBACK_SOURCE, Retrieved};
    use crate::resolver::{Document, DocumentSource, FetchResult};

    struct FixedSource {
        name: &'static str,
        hits: &'static [&'static str],
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DocumentSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, doi: &str) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hits.contains(&doi) {
                FetchResult::Content(Document {
                    bytes: format!("%PDF {doi}").into_bytes(),
                    content_type: Some("application/pdf".to_string()),
                    url: format!("{}{doi}.pdf", self.name),
                })
            } else {
                FetchResult::NotFound("HTTP 404".to_string())
            }
        }
    }

    struct CountingFallback {
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    #[async_trait]
    impl FallbackSource for CountingFallback {
        async fn resolve(&self, doi: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                FetchOutcome::Success(Retrieved {
                    doi: doi.to_string(),
                    content: b"%PDF oa".to_vec(),
                    suggested_name: "oa.pdf".to_string(),
                    source_used: FALLBACK_SOURCE.to_string(),
                    content_type: None,
                })
            } else {
                FetchOutcome::failure(doi, ErrorKind::NotFoundAnywhere, "no open-access copy reported")
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        states: Mutex<Vec<(usize, DoiState)>>,
        finished: AtomicUsize,
    }

    impl BatchObserver for RecordingObserver {
        fn on_state(&self, index: usize, _doi: &str, state: DoiState) {
            self.states.lock().unwrap().push((index, state));
        }

        fn on_finish(&self, _index: usize, _outcome: &FetchOutcome) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client() -> Arc<SourceClient> {
        Arc::new(SourceClient::new(&FetchSettings::default(), Arc::new(RateLimiter::disabled())).unwrap())
    }

    fn chain_with(hits: &'static [&'static str], calls: &Arc<AtomicUsize>) -> MirrorChain {
        let mut chain = MirrorChain::new();
        chain.register(Box::new(FixedSource {
            name: "https://m1/",
            hits: &[],
            calls: Arc::clone(calls),
        }));
        chain.register(Box::new(FixedSource {
            name: "https://m2/",
            hits,
            calls: Arc::clone(calls),
        }));
        chain
    }

    #[tokio::test]
    async fn test_run_preserves_input_order_and_length() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain_with(&["10.1/a", "10.1/c"], &calls);
        let orchestrator = BatchOrchestrator::from_parts(client(), None).with_concurrency(4);

        let result = orchestrator
            .run_with_chain(&["10.1/a", "10.1/b", "10.1/c"], &chain)
            .await;

        assert_eq!(result.len(), 3);
        let dois: Vec<&str> = result.outcomes().iter().map(FetchOutcome::doi).collect();
        assert_eq!(dois, ["10.1/a", "10.1/b", "10.1/c"]);
        assert!(result.outcomes()[0].is_success());
        assert_eq!(result.outcomes()[1].reason(), Some(ErrorKind::NotFoundAnywhere));
        assert!(result.outcomes()[2].is_success());
    }

    #[tokio::test]
    async fn test_invalid_doi_fails_without_network_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let chain = chain_with(&[], &calls);
        let orchestrator = BatchOrchestrator::from_parts(
            client(),
            Some(Arc::new(CountingFallback {
                calls: Arc::clone(&fallback_calls),
                succeed: true,
            })),
        );

        let result = orchestrator.run_with_chain(&["   ", "\"\""], &chain).await;

        assert_eq!(result.failure_count(), 2);
        for outcome in result.outcomes() {
            assert_eq!(outcome.reason(), Some(ErrorKind::InvalidDoi));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_only_after_mirrors_exhausted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let chain = chain_with(&["10.1/hit"], &calls);
        let orchestrator = BatchOrchestrator::from_parts(
            client(),
            Some(Arc::new(CountingFallback {
                calls: Arc::clone(&fallback_calls),
                succeed: true,
            })),
        );

        let result = orchestrator.run_with_chain(&["10.1/hit", "10.1/miss"], &chain).await;

        let FetchOutcome::Success(first) = &result.outcomes()[0] else {
            panic!("expected mirror success");
        };
        assert_eq!(first.source_used, "https://m2/");
        let FetchOutcome::Success(second) = &result.outcomes()[1] else {
            panic!("expected fallback success");
        };
        assert_eq!(second.source_used, FALLBACK_SOURCE);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_detail_includes_mirror_notes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain_with(&[], &calls);
        let orchestrator = BatchOrchestrator::from_parts(
            client(),
            Some(Arc::new(CountingFallback {
                calls: Arc::new(AtomicUsize::new(0)),
                succeed: false,
            })),
        );

        let result = orchestrator.run_with_chain(&["10.1/none"], &chain).await;
        let failure = result.failures().next().unwrap();
        assert_eq!(failure.reason, ErrorKind::NotFoundAnywhere);
        assert!(failure.detail.contains("https://m1/"), "{}", failure.detail);
        assert!(failure.detail.contains("https://m2/"), "{}", failure.detail);
    }

    #[tokio::test]
    async fn test_observer_sees_state_machine() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain_with(&[], &calls);
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator = BatchOrchestrator::from_parts(
            client(),
            Some(Arc::new(CountingFallback {
                calls: Arc::new(AtomicUsize::new(0)),
                succeed: false,
            })),
        )
        .with_observer(observer.clone());

        orchestrator.run_with_chain(&["10.1/x"], &chain).await;

        let states: Vec<DoiState> = observer.states.lock().unwrap().iter().map(|(_, s)| *s).collect();
        assert_eq!(
            states,
            [DoiState::TryingMirrors, DoiState::TryingFallback, DoiState::Failed]
        );
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_rejects_no_sources() {
        let orchestrator = BatchOrchestrator::from_parts(client(), None);
        let err = orchestrator
            .run(&["10.1/a"], &MirrorConfig::new(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NoSources));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_mirror() {
        let orchestrator = BatchOrchestrator::from_parts(client(), None);
        let err = orchestrator
            .run(&["10.1/a"], &MirrorConfig::new(["mirror-without-scheme"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Resolve(ResolveError::InvalidMirror { .. })));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(MAX_CONCURRENCY).is_ok());
        assert!(matches!(
            validate_concurrency(0),
            Err(BatchError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_doi_state_terminal() {
        assert!(DoiState::Resolved.is_terminal());
        assert!(DoiState::Failed.is_terminal());
        assert!(!DoiState::TryingFallback.is_terminal());
        assert_eq!(DoiState::TryingMirrors.to_string(), "trying_mirrors");
    }
}
