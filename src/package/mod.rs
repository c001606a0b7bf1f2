//! Packaging of a finished batch: the document archive, the failure report
//! and the run summary.
//!
//! Nothing here talks to the network; every function works from a
//! [`BatchResult`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::download::filename::unique_entry_name;
use crate::outcome::{BatchResult, FetchOutcome};

/// Default archive file name.
pub const DEFAULT_ARCHIVE_NAME: &str = "downloaded_papers.zip";

/// Default failed-DOI list file name.
pub const DEFAULT_FAILED_LIST_NAME: &str = "failed_dois.txt";

/// Archive entry listing every DOI and what happened to it.
pub const MANIFEST_NAME: &str = "MANIFEST.txt";

/// Errors from writing packaging outputs.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The output file could not be created or written
    #[error("cannot write '{}': {source}\n  Suggestion: Check that the directory exists and is writable", path.display())]
    Io {
        /// Output path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// An archive entry could not be written
    #[error("archive entry '{entry}' failed: {source}")]
    Entry {
        /// Entry name
        entry: String,
        /// Underlying failure
        #[source]
        source: ZipError,
    },

    /// The archive could not be finalized
    #[error("archive could not be finalized: {0}")]
    Finish(#[source] ZipError),
}

impl PackageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn entry(entry: &str, source: impl Into<ZipError>) -> Self {
        Self::Entry {
            entry: entry.to_string(),
            source: source.into(),
        }
    }
}

/// One document written to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// DOI the document belongs to.
    pub doi: String,
    /// Entry name inside the archive.
    pub name: String,
    /// Document size.
    pub bytes: usize,
}

/// Writes every retrieved document plus [`MANIFEST_NAME`] into a zip archive.
///
/// Entry names come from each document's suggested name; repeated names get
/// `_1`, `_2` suffixes in input order. Returns the writer and the entries
/// written, in input order.
///
/// # Errors
///
/// Returns [`PackageError`] when an entry cannot be written or the archive
/// cannot be finalized.
pub fn write_archive<W: Write + Seek>(
    result: &BatchResult,
    writer: W,
) -> Result<(W, Vec<ArchiveEntry>), PackageError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);
    let mut used = HashSet::from([MANIFEST_NAME.to_string()]);
    let mut names: Vec<Option<String>> = Vec::with_capacity(result.len());
    let mut entries = Vec::new();

    for outcome in result.outcomes() {
        let FetchOutcome::Success(document) = outcome else {
            names.push(None);
            continue;
        };
        let name = unique_entry_name(&document.suggested_name, &mut used);
        zip.start_file(name.as_str(), options)
            .map_err(|e| PackageError::entry(&name, e))?;
        zip.write_all(&document.content)
            .map_err(|e| PackageError::entry(&name, e))?;
        debug!(entry = %name, bytes = document.content.len(), "archived document");
        entries.push(ArchiveEntry {
            doi: document.doi.clone(),
            name: name.clone(),
            bytes: document.content.len(),
        });
        names.push(Some(name));
    }

    zip.start_file(MANIFEST_NAME, options)
        .map_err(|e| PackageError::entry(MANIFEST_NAME, e))?;
    zip.write_all(manifest_text(result, &names).as_bytes())
        .map_err(|e| PackageError::entry(MANIFEST_NAME, e))?;

    let writer = zip.finish().map_err(PackageError::Finish)?;
    Ok((writer, entries))
}

/// Writes the archive to `path`.
///
/// # Errors
///
/// Returns [`PackageError`] when the file cannot be created or written.
#[instrument(skip(result), fields(path = %path.display()))]
pub fn write_archive_file(result: &BatchResult, path: &Path) -> Result<Vec<ArchiveEntry>, PackageError> {
    let file = File::create(path).map_err(|e| PackageError::io(path, e))?;
    let (writer, entries) = write_archive(result, BufWriter::new(file))?;
    writer
        .into_inner()
        .map_err(|e| PackageError::io(path, e.into_error()))?
        .sync_all()
        .map_err(|e| PackageError::io(path, e))?;
    info!(entries = entries.len(), "archive written");
    Ok(entries)
}

/// Writes [`failed_dois_text`] to `path`.
///
/// # Errors
///
/// Returns [`PackageError::Io`] when the file cannot be written.
pub fn write_failed_list(result: &BatchResult, path: &Path) -> Result<(), PackageError> {
    std::fs::write(path, failed_dois_text(result)).map_err(|e| PackageError::io(path, e))
}

/// Manifest body: one tab-separated line per input DOI, in input order.
///
/// Successes read `index, doi, "ok", entry name, source`; failures read
/// `index, doi, reason, detail`.
fn manifest_text(result: &BatchResult, names: &[Option<String>]) -> String {
    let mut text = String::from("# index\tdoi\tstatus\tfile-or-detail\tsource\n");
    for (index, (outcome, name)) in result.outcomes().iter().zip(names).enumerate() {
        let line = match (outcome, name) {
            (FetchOutcome::Success(document), Some(name)) => format!(
                "{}\t{}\tok\t{name}\t{}",
                index + 1,
                document.doi,
                document.source_used
            ),
            (FetchOutcome::Failure(record), _) => format!(
                "{}\t{}\t{}\t{}",
                index + 1,
                record.doi,
                record.reason,
                single_line(&record.detail)
            ),
            (FetchOutcome::Success(document), None) => {
                format!("{}\t{}\tok", index + 1, document.doi)
            }
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Human-readable failure report: `DOI<TAB>reason<TAB>detail` per failure.
#[must_use]
pub fn failure_report(result: &BatchResult) -> String {
    result
        .failures()
        .map(|record| {
            format!(
                "{}\t{}\t{}\n",
                record.doi,
                record.reason,
                single_line(&record.detail)
            )
        })
        .collect()
}

/// Failed DOIs, one per line, in input order.
///
/// Blank invalid inputs are skipped since there is nothing to retry.
#[must_use]
pub fn failed_dois_text(result: &BatchResult) -> String {
    result
        .failures()
        .filter(|record| !record.doi.is_empty())
        .map(|record| format!("{}\n", record.doi))
        .collect()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Totals for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of input DOIs.
    pub total: usize,
    /// Documents retrieved.
    pub succeeded: usize,
    /// DOIs that failed.
    pub failed: usize,
    /// Successes per source (mirror base URL or fallback label).
    pub by_source: BTreeMap<String, usize>,
    /// Failures per reason label.
    pub by_reason: BTreeMap<&'static str, usize>,
}

impl BatchSummary {
    /// Tallies a batch result.
    #[must_use]
    pub fn from_result(result: &BatchResult) -> Self {
        let mut summary = Self {
            total: result.len(),
            ..Self::default()
        };
        for outcome in result.outcomes() {
            match outcome {
                FetchOutcome::Success(document) => {
                    summary.succeeded += 1;
                    *summary.by_source.entry(document.source_used.clone()).or_default() += 1;
                }
                FetchOutcome::Failure(record) => {
                    summary.failed += 1;
                    *summary.by_reason.entry(record.reason.as_str()).or_default() += 1;
                }
            }
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} DOIs: {} retrieved, {} failed",
            self.total, self.succeeded, self.failed
        )?;
        for (source, count) in &self.by_source {
            write!(f, "\n  {count} from {source}")?;
        }
        for (reason, count) in &self.by_reason {
            write!(f, "\n  {count} {reason}")?;
        }
        Ok(())
    }
}
