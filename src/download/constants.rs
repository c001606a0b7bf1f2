//! Constants for network behaviour (timeouts, politeness, body limits).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total request timeout (30 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default minimum spacing between requests to the same host.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Warning threshold for cumulative politeness delay per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Documents larger than this are abandoned mid-stream (200 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 200 * 1024 * 1024;

/// Bodies smaller than this are sniffed for HTML placeholder pages.
pub const PLACEHOLDER_SNIFF_THRESHOLD: usize = 10_000;

/// Number of leading bytes inspected when sniffing for HTML.
pub const PLACEHOLDER_SNIFF_BYTES: usize = 1000;
