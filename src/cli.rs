//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use paper_fetch::download::DEFAULT_RATE_LIMIT_MS;
use paper_fetch::package::{DEFAULT_ARCHIVE_NAME, DEFAULT_FAILED_LIST_NAME};
use paper_fetch::resolver::DEFAULT_CONCURRENCY;

/// Batch retrieve academic papers by DOI.
///
/// Each DOI is tried against up to three mirrors (a refused request is retried
/// once through a rendering proxy), then against the Unpaywall open-access
/// lookup. Retrieved papers are packed into one zip archive; failed DOIs are
/// listed in a text file.
#[derive(Parser, Debug)]
#[command(name = "paper-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// DOIs to retrieve (also accepts doi.org URLs and `doi:` prefixes)
    #[arg(value_name = "DOI")]
    pub dois: Vec<String>,

    /// Read DOIs from a file (comma or newline separated)
    #[arg(short, long, value_name = "FILE", conflicts_with = "dois")]
    pub input: Option<PathBuf>,

    /// Mirror base URL, in priority order (repeatable; only the first three are used)
    #[arg(short, long = "mirror", value_name = "URL")]
    pub mirrors: Vec<String>,

    /// Archive to write retrieved papers to
    #[arg(short, long, value_name = "ZIP")]
    pub output: Option<PathBuf>,

    /// File listing DOIs that could not be retrieved
    #[arg(long, value_name = "FILE", default_value = DEFAULT_FAILED_LIST_NAME)]
    pub failed_list: PathBuf,

    /// DOIs processed at once (1-32)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: Option<u8>,

    /// Total per-request timeout in seconds (1-600)
    #[arg(short = 't', long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: Option<u64>,

    /// Minimum delay between requests to same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: Option<u64>,

    /// Rendering proxy prefix used once when a request is refused
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Contact address sent to the open-access lookup
    #[arg(long, value_name = "ADDR")]
    pub email: Option<String>,

    /// Skip the open-access lookup after mirrors fail
    #[arg(long)]
    pub no_fallback: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Archive path from the flag, else the config file, else the default.
    #[must_use]
    pub fn output_or(&self, configured: Option<&PathBuf>) -> PathBuf {
        self.output
            .clone()
            .or_else(|| configured.cloned())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_NAME))
    }

    /// Concurrency from the flag, else the config file, else the default.
    #[must_use]
    pub fn concurrency_or(&self, configured: Option<u8>) -> usize {
        self.concurrency
            .or(configured)
            .map_or(DEFAULT_CONCURRENCY, usize::from)
    }

    /// Rate limit from the flag, else the config file, else the default.
    #[must_use]
    pub fn rate_limit_or(&self, configured: Option<u64>) -> u64 {
        self.rate_limit.or(configured).unwrap_or(DEFAULT_RATE_LIMIT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["paper-fetch"]).unwrap();
        assert!(args.dois.is_empty());
        assert!(args.input.is_none());
        assert!(args.mirrors.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.no_fallback);
        assert_eq!(args.failed_list, PathBuf::from("failed_dois.txt"));
        assert_eq!(args.output_or(None), PathBuf::from("downloaded_papers.zip"));
        assert_eq!(args.concurrency_or(None), 1);
        assert_eq!(args.rate_limit_or(None), 1000);
    }

    #[test]
    fn test_cli_positional_dois() {
        let args = Args::try_parse_from(["paper-fetch", "10.1/a", "doi:10.1/b"]).unwrap();
        assert_eq!(args.dois, ["10.1/a", "doi:10.1/b"]);
    }

    #[test]
    fn test_cli_input_conflicts_with_positional() {
        let result = Args::try_parse_from(["paper-fetch", "10.1/a", "--input", "list.txt"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_repeated_mirror_flags_keep_order() {
        let args = Args::try_parse_from([
            "paper-fetch",
            "--mirror",
            "https://b.example/",
            "-m",
            "https://a.example/",
        ])
        .unwrap();
        assert_eq!(args.mirrors, ["https://b.example/", "https://a.example/"]);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["paper-fetch", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["paper-fetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["paper-fetch", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["paper-fetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["paper-fetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["paper-fetch", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["paper-fetch", "-c", "32"]).unwrap();
        assert_eq!(args.concurrency, Some(32));

        let err = Args::try_parse_from(["paper-fetch", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["paper-fetch", "-c", "33"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_bounds() {
        let args = Args::try_parse_from(["paper-fetch", "--timeout", "60"]).unwrap();
        assert_eq!(args.timeout, Some(60));

        let err = Args::try_parse_from(["paper-fetch", "--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_rate_limit_zero_disables() {
        let args = Args::try_parse_from(["paper-fetch", "-l", "0"]).unwrap();
        assert_eq!(args.rate_limit_or(Some(500)), 0);
    }

    #[test]
    fn test_cli_rate_limit_over_max_rejected() {
        let err = Args::try_parse_from(["paper-fetch", "-l", "60001"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_flags_override_configured_values() {
        let args = Args::try_parse_from(["paper-fetch", "-c", "4", "-o", "out.zip"]).unwrap();
        assert_eq!(args.concurrency_or(Some(2)), 4);
        assert_eq!(
            args.output_or(Some(&PathBuf::from("cfg.zip"))),
            PathBuf::from("out.zip")
        );

        let args = Args::try_parse_from(["paper-fetch"]).unwrap();
        assert_eq!(args.concurrency_or(Some(2)), 2);
        assert_eq!(
            args.output_or(Some(&PathBuf::from("cfg.zip"))),
            PathBuf::from("cfg.zip")
        );
    }

    #[test]
    fn test_cli_no_fallback_and_endpoints() {
        let args = Args::try_parse_from([
            "paper-fetch",
            "--no-fallback",
            "--proxy",
            "https://proxy.example/",
            "--email",
            "me@lab.example",
        ])
        .unwrap();
        assert!(args.no_fallback);
        assert_eq!(args.proxy.as_deref(), Some("https://proxy.example/"));
        assert_eq!(args.email.as_deref(), Some("me@lab.example"));
    }
}
