//! Bundle names, file prefixes and paper titles.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Titles shorter than this are treated as placeholders.
const MIN_TITLE_CHARS: usize = 10;

const FALLBACK_NAME: &str = "paper";

/// Matches reference-manager file names such as
/// `Smith et al. - 2021 - Nature Methods - Actual title`.
fn citation_stem_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^-]{1,80}\s-\s\d{4}\s-\s[^-]{1,120}\s-\s(.+)$").unwrap())
}

fn unsafe_path_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|]+"#).unwrap())
}

fn multi_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").unwrap())
}

fn strip_citation_stem(raw: &str) -> &str {
    citation_stem_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(raw)
}

/// Lowercase ASCII slug: runs of anything but `a-z0-9` become one `-`.
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    for c in lower.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        slug.to_string()
    }
}

/// Directory-safe version of a title, keeping its spelling and case.
pub fn safe_paper_name(raw: &str) -> String {
    let name: String = raw.trim().nfc().collect();
    let name = unsafe_path_chars_re().replace_all(&name, "-");
    let name = multi_space_re().replace_all(&name, " ");
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Paper title from the document info title, else from the file stem.
pub fn paper_title(info_title: Option<&str>, pdf_path: &Path) -> String {
    if let Some(raw) = info_title {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = strip_citation_stem(&collapsed);
        if title.chars().count() >= MIN_TITLE_CHARS {
            return title.to_string();
        }
    }

    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    let stem = strip_citation_stem(&stem);
    if stem.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        stem.to_string()
    }
}
