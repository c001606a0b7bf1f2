//! Filename derivation and sanitization for retrieved documents.
//!
//! Documents are named after their DOI (`10.1234/abc` → `10.1234_abc.pdf`) so
//! archive entries stay meaningful without extra metadata lookups.

use std::collections::HashSet;
use std::path::{Component, Path};

use url::Url;

/// Extension used when neither the content type nor the URL tells us better.
const DEFAULT_EXTENSION: &str = ".pdf";

/// Builds the suggested archive name for a retrieved document.
///
/// The stem is the sanitized DOI. The extension comes from the Content-Type
/// header when it names a known document type, then from the document URL,
/// and defaults to `.pdf`.
#[must_use]
pub fn suggested_filename(doi: &str, content_type: Option<&str>, document_url: &str) -> String {
    let stem = sanitize_filename(doi);
    let stem = if stem.trim_matches('_').is_empty() || !is_safe_filename_segment(&stem) {
        "paper".to_string()
    } else {
        stem
    };

    let extension = content_type
        .and_then(extension_from_content_type)
        .map(str::to_string)
        .or_else(|| extension_from_url(document_url))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{stem}{extension}")
}

/// Returns `name` or the first `stem_N.ext` variant not yet in `used`, and records it.
///
/// Example: `file.pdf`, then `file_1.pdf`, `file_2.pdf`, ...
pub(crate) fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let mut counter = 1usize;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Guess a document extension from a Content-Type header.
///
/// Returns `None` for types that do not identify a document format
/// (`application/octet-stream`, HTML landing pages, unknown types).
pub(crate) fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "application/pdf" | "application/x-pdf" => Some(".pdf"),
        "application/epub+zip" => Some(".epub"),
        "application/postscript" => Some(".ps"),
        "application/msword" => Some(".doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some(".docx"),
        "application/x-djvu" | "image/vnd.djvu" => Some(".djvu"),
        _ => None,
    }
}

pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = last_segment[dot_index..].to_lowercase();
    matches!(ext.as_str(), ".pdf" | ".epub" | ".ps" | ".djvu" | ".doc" | ".docx").then_some(ext)
}

/// Sanitizes a filename for archive and filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }
    sanitized
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
