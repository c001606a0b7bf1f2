//! Shared HTTP client construction policy for sources.
//!
//! Mirror and lookup clients share timeouts, compression and proxy handling;
//! they differ only in their default User-Agent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::Client;
use reqwest::{ClientBuilder, Proxy};
use tracing::warn;

use super::ResolveError;

/// Timeouts applied to every request a client sends.
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    /// TCP connect timeout.
    pub connect: Duration,
    /// Total request timeout, body included.
    pub total: Duration,
}

/// Builds an HTTP client for `component` using shared project policy.
///
/// `user_agent` becomes the default header; pass `None` when the caller sets
/// one per request (mirror traffic rotates browser identities).
///
/// # Errors
///
/// Returns [`ResolveError::ClientBuild`] when construction fails.
pub fn build_http_client(
    component: &'static str,
    user_agent: Option<&str>,
    timeouts: HttpTimeouts,
) -> Result<Client, ResolveError> {
    match try_build_client(user_agent, timeouts, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; env proxies still apply on the fallback builder.
            warn!(
                component,
                "client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(user_agent, timeouts, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ResolveError::client_build(
                    component,
                    "construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(ResolveError::client_build(component, error))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(ResolveError::client_build(component, error)),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: Option<&str>,
    timeouts: HttpTimeouts,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.map(str::to_string);
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: Option<String>, timeouts: HttpTimeouts) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.total)
        .gzip(true);

    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }

    builder
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeouts() -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(1),
            total: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_build_http_client_without_default_user_agent() {
        assert!(build_http_client("mirror", None, timeouts()).is_ok());
    }

    #[test]
    fn test_build_http_client_with_lookup_user_agent() {
        let ua = crate::user_agent::default_lookup_user_agent();
        assert!(build_http_client("lookup", Some(&ua), timeouts()).is_ok());
    }

    #[test]
    fn test_env_proxy_for_unknown_scheme_is_none() {
        assert!(env_proxy_for_scheme("ftp").is_none());
    }
}
