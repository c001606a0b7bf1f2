//! Download-side helpers shared by every retrieval step.
//!
//! - [`rate_limiter`] - per-host politeness delays
//! - [`filename`] - archive names derived from DOI and content type
//! - [`constants`] - timeout, politeness and body-size defaults

pub mod constants;
pub mod filename;
pub mod rate_limiter;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_MS, MAX_DOCUMENT_BYTES, REQUEST_TIMEOUT_SECS,
};
pub use filename::suggested_filename;
pub use rate_limiter::{RateLimiter, extract_host};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, SomeError>` explicitly in function signatures.
