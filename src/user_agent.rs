//! Shared User-Agent strings for mirror and lookup HTTP traffic.
//!
//! Mirrors occasionally answer 403 to tool-identifying agents, so mirror
//! requests rotate through a small set of browser agents. The open-access
//! lookup API is polite-pool style and gets an agent that identifies the tool.

use rand::seq::SliceRandom;

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/paper-fetch";

/// Browser agents used for mirror and document requests.
pub(crate) const BROWSER_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/115.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/15.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/112.0 Safari/537.36",
];

/// Picks one browser agent at random.
#[must_use]
pub(crate) fn random_browser_user_agent() -> &'static str {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0])
}

/// User-Agent for open-access lookup requests (identifies the tool).
#[must_use]
pub(crate) fn default_lookup_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("paper-fetch/{version} (research-tool; +{PROJECT_UA_URL})")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_random_browser_user_agent_is_from_fixed_set() {
        for _ in 0..20 {
            let ua = random_browser_user_agent();
            assert!(BROWSER_USER_AGENTS.contains(&ua), "unexpected agent: {ua}");
            assert!(ua.starts_with("Mozilla/5.0"));
        }
    }

    #[test]
    fn test_lookup_user_agent_contains_version_and_project_url() {
        let ua = default_lookup_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "lookup UA must contain project URL");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("paper-fetch/")
                .and_then(|s| s.split(' ').next())
                .unwrap(),
        );
        assert!(ua.contains("research-tool"));
    }
}
