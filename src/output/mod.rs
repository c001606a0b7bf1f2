//! CLI output formatting and display helpers.

use std::path::Path;

use paper_fetch::{BatchResult, BatchSummary};

/// Message when no input was provided at all.
pub const NO_INPUT_GUIDANCE: &str = "No DOIs provided. Pass DOIs as arguments, use --input, or pipe them via stdin.";

/// Message when stdin was piped but held no DOI.
pub const EMPTY_STDIN_GUIDANCE: &str =
    "Received empty input. Pass DOIs as arguments, use --input, or pipe them via stdin.";

/// Example for passing DOIs as arguments.
pub const INPUT_ARG_EXAMPLE: &str = "Example: paper-fetch 10.1038/nature12373 10.1126/science.1157784";

/// Example for reading a DOI list file.
pub const INPUT_FILE_EXAMPLE: &str = "Example: paper-fetch --input dois.txt --output papers.zip";

/// Example for piping input.
pub const INPUT_PIPE_EXAMPLE: &str = "Example: echo '10.1038/nature12373' | paper-fetch";

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Returns lines for quick-start guidance (headline + examples), truncated to width.
pub fn quick_start_guidance_lines(empty_input: bool, width: usize) -> Vec<String> {
    let headline = if empty_input {
        EMPTY_STDIN_GUIDANCE
    } else {
        NO_INPUT_GUIDANCE
    };

    [headline, INPUT_ARG_EXAMPLE, INPUT_FILE_EXAMPLE, INPUT_PIPE_EXAMPLE]
        .iter()
        .map(|line| truncate_to_width(line, width))
        .collect()
}

/// Prints quick-start guidance to stdout.
pub fn print_quick_start_guidance(empty_input: bool) {
    let width = terminal_width().min(80);
    for line in quick_start_guidance_lines(empty_input, width) {
        println!("{line}");
    }
}

/// Where the run's files ended up.
#[derive(Debug, Clone, Copy)]
pub struct WrittenFiles<'a> {
    /// Archive path, when at least one paper was retrieved.
    pub archive: Option<&'a Path>,
    /// Failed-DOI list path, when at least one DOI failed.
    pub failed_list: Option<&'a Path>,
}

/// Builds the end-of-run summary lines.
pub fn summary_lines(result: &BatchResult, files: WrittenFiles<'_>, width: usize) -> Vec<String> {
    let summary = BatchSummary::from_result(result);
    let mut lines: Vec<String> = summary.to_string().lines().map(str::to_string).collect();

    if let Some(archive) = files.archive {
        lines.push(format!("Archive: {}", archive.display()));
    }
    if let Some(failed_list) = files.failed_list {
        lines.push(format!("Failed DOIs: {}", failed_list.display()));
    }

    for record in result.failures() {
        let doi = if record.doi.is_empty() {
            "(empty)"
        } else {
            record.doi.as_str()
        };
        lines.push(truncate_to_width(
            &format!("  ✗ {doi} [{}] {}", record.reason, record.detail),
            width,
        ));
    }
    lines
}

/// Prints the end-of-run summary to stdout.
pub fn print_summary(result: &BatchResult, files: WrittenFiles<'_>) {
    for line in summary_lines(result, files, terminal_width()) {
        println!("{line}");
    }
}
