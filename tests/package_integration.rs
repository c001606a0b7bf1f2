//! Packaging tests: archive layout, manifest and failed-DOI list on disk.

#![allow(clippy::unwrap_used)]

use std::fs::File;
use std::io::Read;

use paper_fetch::package::{MANIFEST_NAME, write_archive_file, write_failed_list};
use paper_fetch::{BatchResult, BatchSummary, ErrorKind, FetchOutcome, Retrieved, failure_report};
use tempfile::TempDir;
use zip::ZipArchive;

fn retrieved(doi: &str, name: &str, source: &str, body: &[u8]) -> FetchOutcome {
    FetchOutcome::Success(Retrieved {
        doi: doi.to_string(),
        content: body.to_vec(),
        suggested_name: name.to_string(),
        source_used: source.to_string(),
        content_type: Some("application/pdf".to_string()),
    })
}

fn mixed_result() -> BatchResult {
    BatchResult::new(vec![
        retrieved("10.1/aaa", "10.1_aaa.pdf", "https://m1.example/", b"%PDF-a"),
        FetchOutcome::failure("", ErrorKind::InvalidDoi, "empty DOI"),
        retrieved("10.1/bbb", "10.1_bbb.pdf", "fallback-api", b"%PDF-b"),
        FetchOutcome::failure(
            "10.1/ccc",
            ErrorKind::NotFoundAnywhere,
            "no open-access copy reported\nmirrors: m1 404",
        ),
        retrieved("10.1/aaa", "10.1_aaa.pdf", "https://m2.example/", b"%PDF-dup"),
    ])
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

/// Every retrieved document lands in the archive with a unique name.
#[test]
fn test_archive_contains_documents_and_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("papers.zip");

    let entries = write_archive_file(&mixed_result(), &path).unwrap();
    let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, ["10.1_aaa.pdf", "10.1_bbb.pdf", "10.1_aaa_1.pdf"]);

    let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
    assert_eq!(archive.len(), 4);
    assert_eq!(read_entry(&mut archive, "10.1_aaa.pdf"), b"%PDF-a");
    assert_eq!(read_entry(&mut archive, "10.1_bbb.pdf"), b"%PDF-b");
    assert_eq!(read_entry(&mut archive, "10.1_aaa_1.pdf"), b"%PDF-dup");

    let manifest = String::from_utf8(read_entry(&mut archive, MANIFEST_NAME)).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with('#'));
    assert_eq!(lines[1], "1\t10.1/aaa\tok\t10.1_aaa.pdf\thttps://m1.example/");
    assert_eq!(lines[2], "2\t\tinvalid_doi\tempty DOI");
    assert_eq!(lines[3], "3\t10.1/bbb\tok\t10.1_bbb.pdf\tfallback-api");
    assert_eq!(
        lines[4],
        "4\t10.1/ccc\tnot_found_anywhere\tno open-access copy reported mirrors: m1 404"
    );
    assert_eq!(lines[5], "5\t10.1/aaa\tok\t10.1_aaa_1.pdf\thttps://m2.example/");
}

/// The failed list keeps input order and skips blank inputs.
#[test]
fn test_failed_list_written_in_input_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("failed_dois.txt");

    write_failed_list(&mixed_result(), &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "10.1/ccc\n");

    let report = failure_report(&mixed_result());
    assert_eq!(report.lines().count(), 2);
    assert!(report.starts_with("\tinvalid_doi\tempty DOI\n"));
}

/// Writing into a missing directory reports the path.
#[test]
fn test_archive_into_missing_directory_fails_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("papers.zip");

    let err = write_archive_file(&mixed_result(), &path).unwrap_err();
    assert!(err.to_string().contains("papers.zip"), "error: {err}");
}

/// Summary tallies match the archive contents.
#[test]
fn test_summary_counts_sources_and_reasons() {
    let summary = BatchSummary::from_result(&mixed_result());
    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.by_source.get("fallback-api"), Some(&1));
    assert_eq!(summary.by_reason.get("invalid_doi"), Some(&1));
    assert_eq!(summary.by_reason.get("not_found_anywhere"), Some(&1));
}
