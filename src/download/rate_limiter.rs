//! Per-host politeness delays for mirror, proxy and lookup requests.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum
//! delay between requests to the same host. Requests to different hosts
//! proceed without waiting for each other, so concurrent DOIs only serialize
//! where they share a mirror.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use paper_fetch::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//!
//! // First request proceeds immediately
//! limiter.acquire("https://sci-hub.se/10.1234/a").await;
//!
//! // Second request to same host waits for the delay
//! limiter.acquire("https://sci-hub.se/10.1234/b").await;
//!
//! // Request to different host proceeds immediately
//! limiter.acquire("https://api.unpaywall.org/v2/10.1234/a").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::CUMULATIVE_DELAY_WARNING_THRESHOLD;

/// Per-host rate limiter.
///
/// Designed to be wrapped in `Arc` and shared across concurrent DOI tasks.
/// `DashMap` gives lock-free access to per-host state; the per-host
/// `tokio::sync::Mutex` makes the read-wait-update sequence atomic.
///
/// Each wait is the base delay plus a random jitter of up to half the base
/// delay, so request spacing does not look machine-regular.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between requests to the same host.
    min_delay: Duration,

    /// Whether rate limiting is disabled (for `--rate-limit 0`).
    disabled: bool,

    /// Per-host state. Arc lets us release the `DashMap` shard before awaiting.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// `None` until the first request to this host.
    last_request: Mutex<Option<Instant>>,

    /// Cumulative delay applied to this host, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a rate limiter with the given minimum per-host delay.
    ///
    /// A zero delay yields a disabled limiter.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = min_delay.as_millis()))]
    pub fn new(min_delay: Duration) -> Self {
        if min_delay.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            min_delay,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a disabled rate limiter that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_delay: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum delay between requests to one host.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until a request to the URL's host is allowed, then records it.
    ///
    /// The first request to any host proceeds immediately.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request_guard = state.last_request.lock().await;

        if let Some(last_request) = *last_request_guard {
            let target = self.min_delay + self.jitter();
            let elapsed = last_request.elapsed();

            if elapsed < target {
                let delay = target.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying politeness delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive politeness delay - consider fewer DOIs per run for this host"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        } else {
            debug!(host = %host, "first request to host - no delay");
        }

        *last_request_guard = Some(Instant::now());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn jitter(&self) -> Duration {
        let max_jitter_ms = (self.min_delay.as_millis() / 2) as u64;
        if max_jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter_ms))
    }
}

/// Extracts the lowercased host from a URL.
///
/// Returns "unknown" for malformed URLs so they are still rate limited.
///
/// # Examples
///
/// ```
/// use paper_fetch::download::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://Sci-Hub.SE/10.1/x"), "sci-hub.se");
/// assert_eq!(extract_host("https://localhost:8080/x"), "localhost");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
