//! CLI entry point for the paper-fetch tool.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use paper_fetch::package::{write_archive_file, write_failed_list};
use paper_fetch::resolver::{DEFAULT_PROXY_BASE, DEFAULT_UNPAYWALL_EMAIL};
use paper_fetch::{BatchOrchestrator, FetchSettings, MirrorConfig, parse_doi_list};
use tracing::{debug, info};

mod app_config;
mod cli;
mod output;
mod progress;

use app_config::{FileConfig, load_default_file_config};
use cli::Args;
use output::WrittenFiles;
use progress::{BarLogWriter, ProgressObserver};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Log lines go through the bar so they never tear its redraw
    let bar = progress::idle_bar();
    let log_bar = bar.clone();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || BarLogWriter::new(log_bar.clone()))
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_default_file_config()?;
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.config.is_some()) {
        debug!(path = %path.display(), "loaded config file");
    }
    let file_config = loaded.config.unwrap_or_default();

    let Some(input_text) = read_input(&args)? else {
        output::print_quick_start_guidance(false);
        return Ok(());
    };

    let dois = parse_doi_list(&input_text);
    if dois.is_empty() {
        output::print_quick_start_guidance(true);
        return Ok(());
    }
    info!(count = dois.len(), "DOIs to retrieve");

    let mirrors = resolve_mirrors(&args, &file_config);

    let settings = build_settings(&args, &file_config);
    let observer = Arc::new(ProgressObserver::new(
        bar,
        dois.len(),
        !args.quiet && io::stderr().is_terminal(),
    ));
    let orchestrator = BatchOrchestrator::new(&settings)?.with_observer(observer.clone());

    let result = orchestrator.run(&dois, &mirrors).await?;
    observer.finish();

    let archive_path = args.output_or(file_config.output.as_ref());
    let archive = if result.success_count() > 0 {
        write_archive_file(&result, &archive_path)?;
        Some(archive_path.as_path())
    } else {
        None
    };

    let failed_list = if result.failure_count() > 0 {
        write_failed_list(&result, &args.failed_list)?;
        Some(args.failed_list.as_path())
    } else {
        None
    };

    if !args.quiet {
        output::print_summary(
            &result,
            WrittenFiles {
                archive,
                failed_list,
            },
        );
    }

    Ok(())
}

/// Positional DOIs, else the `--input` file, else piped stdin.
///
/// Returns `None` when no input source is available at all.
fn read_input(args: &Args) -> Result<Option<String>> {
    if !args.dois.is_empty() {
        return Ok(Some(args.dois.join("\n")));
    }
    if let Some(path) = &args.input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()))?;
        return Ok(Some(text));
    }
    if io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read DOIs from stdin")?;
    Ok(Some(buffer))
}

/// `--mirror` flags, else config file mirrors, else the built-in defaults.
fn resolve_mirrors(args: &Args, file_config: &FileConfig) -> MirrorConfig {
    if !args.mirrors.is_empty() {
        return MirrorConfig::new(&args.mirrors);
    }
    match &file_config.mirrors {
        Some(mirrors) if !mirrors.is_empty() => MirrorConfig::new(mirrors),
        _ => MirrorConfig::default(),
    }
}

fn build_settings(args: &Args, file_config: &FileConfig) -> FetchSettings {
    let defaults = FetchSettings::default();
    let request_timeout = args
        .timeout
        .or(file_config.timeout_secs)
        .map_or(defaults.request_timeout, Duration::from_secs);

    FetchSettings {
        request_timeout,
        connect_timeout: defaults.connect_timeout.min(request_timeout),
        proxy_base: args
            .proxy
            .clone()
            .or_else(|| file_config.proxy.clone())
            .unwrap_or_else(|| DEFAULT_PROXY_BASE.to_string()),
        rate_limit: Duration::from_millis(args.rate_limit_or(file_config.rate_limit)),
        unpaywall_email: args
            .email
            .clone()
            .or_else(|| file_config.email.clone())
            .unwrap_or_else(|| DEFAULT_UNPAYWALL_EMAIL.to_string()),
        fallback_enabled: !args.no_fallback && file_config.fallback.unwrap_or(true),
        concurrency: args.concurrency_or(file_config.concurrency),
        ..defaults
    }
}
