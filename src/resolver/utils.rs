//! Shared utilities for sources: landing-page link extraction, URL helpers and
//! body sniffing.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::download::constants::{PLACEHOLDER_SNIFF_BYTES, PLACEHOLDER_SNIFF_THRESHOLD};

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static IFRAME_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<iframe\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#)
});

static EMBED_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<embed\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#)
});

static ANCHOR_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#)
});

static DOWNLOAD_DIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<div\b[^>]*?\bid\s*=\s*["']download["'][^>]*>(.*?)</div>"#,
    )
});

/// Markdown links to `.pdf` targets, as produced by the rendering proxy.
static MARKDOWN_PDF_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)\]\((https?://[^)\s]+?\.pdf(?:[?#][^)\s]*)?)\)")
});

/// Finds the document link on a mirror landing page.
///
/// Candidates are checked in order: iframe `src`, embed `src`, the first
/// anchor whose target ends in `.pdf`, the first anchor inside
/// `div#download`, then a markdown `.pdf` link. Returns the raw attribute
/// value; callers absolutize it.
#[must_use]
pub fn extract_document_link(page: &str) -> Option<String> {
    first_capture(page, &IFRAME_SRC_RE)
        .or_else(|| first_capture(page, &EMBED_SRC_RE))
        .or_else(|| {
            ANCHOR_HREF_RE
                .captures_iter(page)
                .filter_map(|caps| caps.get(1))
                .map(|m| decode_entities(m.as_str().trim()))
                .find(|href| targets_pdf(href))
        })
        .or_else(|| {
            DOWNLOAD_DIV_RE
                .captures(page)
                .and_then(|caps| caps.get(1))
                .and_then(|inner| first_capture(inner.as_str(), &ANCHOR_HREF_RE))
        })
        .or_else(|| first_capture(page, &MARKDOWN_PDF_LINK_RE))
}

fn first_capture(text: &str, regex: &Regex) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|value| !value.is_empty())
}

fn decode_entities(value: &str) -> String {
    value.replace("&amp;", "&")
}

fn targets_pdf(href: &str) -> bool {
    let without_fragment = href.split('#').next().unwrap_or(href);
    without_fragment.to_ascii_lowercase().ends_with(".pdf")
}

/// Resolves a possibly relative URL string against the origin of `base_url`.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with the origin root.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    let origin = base_url.join("/").ok()?;
    origin.join(value).ok().map(|url| url.to_string())
}

/// Percent-encodes each path segment of a DOI, keeping the `/` separators.
///
/// # Examples
///
/// ```
/// use paper_fetch::resolver::utils::encode_doi_path;
///
/// assert_eq!(encode_doi_path("10.1000/a b(c)"), "10.1000/a%20b%28c%29");
/// ```
#[must_use]
pub fn encode_doi_path(doi: &str) -> String {
    doi.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the landing-page URL for `doi` on a mirror.
///
/// A `/` is inserted when the base does not already end with one.
#[must_use]
pub fn mirror_document_url(base_url: &str, doi: &str) -> String {
    let separator = if base_url.ends_with('/') { "" } else { "/" };
    format!("{base_url}{separator}{}", encode_doi_path(doi))
}

/// True when the body or content type identifies a PDF.
#[must_use]
pub fn looks_like_pdf(bytes: &[u8], content_type: Option<&str>) -> bool {
    bytes.starts_with(b"%PDF")
        || content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
}

/// True when a small body is an HTML page standing in for the document.
///
/// Only bodies below the sniff threshold are inspected, and only their
/// leading bytes.
#[must_use]
pub fn is_html_placeholder(bytes: &[u8]) -> bool {
    if bytes.len() >= PLACEHOLDER_SNIFF_THRESHOLD {
        return false;
    }
    let head = &bytes[..bytes.len().min(PLACEHOLDER_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}
