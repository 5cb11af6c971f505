//! Output filename derivation for SQL dumps.
//!
//! The server suggests a name through `Content-Disposition`; the user may
//! replace its stem, prefix it with a UTC timestamp, and the final path is
//! moved aside (`name_(1).sql`, `name_(2).sql`, ...) instead of clobbering an
//! existing file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::warn;

use super::BackupError;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static CONTENT_DISPOSITION_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"filename="([^"]+)""#));

/// Suffixes that wrap a dump format (`.sql.gz`, `.sql.zip`, `.sql.bz2`).
const COMPRESSION_SUFFIXES: &[&str] = &["gz", "bz2", "zip"];

/// phpMyAdmin export formats that may sit under a compression suffix.
const DUMP_FORMATS: &[&str] = &[
    "sql", "csv", "xml", "json", "yml", "tex", "txt", "ods", "odt", "pdf", "php", "md",
];

/// Extracts the server-suggested filename from a `Content-Disposition` value.
///
/// Only the quoted form `filename="<name>"` is accepted. Path separators and
/// control characters in the suggested name are replaced with `_`.
///
/// # Errors
///
/// Returns [`BackupError::FilenameDetectionFailed`] carrying the raw header
/// when it is missing, does not match, or names no usable file.
pub fn detect_filename(header: Option<&str>) -> Result<String, BackupError> {
    header
        .and_then(|value| CONTENT_DISPOSITION_FILENAME_RE.captures(value))
        .and_then(|caps| caps.get(1))
        .and_then(|name| sanitize_detected_filename(name.as_str()))
        .ok_or_else(|| BackupError::filename_detection(header))
}

fn sanitize_detected_filename(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim();
    (!trimmed.is_empty() && trimmed != "." && trimmed != "..").then(|| trimmed.to_string())
}

/// Splits `name` into stem and extension at the last dot.
///
/// A compression suffix over a known dump format stays whole:
/// `dump.sql.gz` → (`dump`, `.sql.gz`), while `db.example.com.gz` →
/// (`db.example.com`, `.gz`). Leading dots never start an extension.
#[must_use]
pub fn split_dump_extension(name: &str) -> (&str, &str) {
    let Some(last) = extension_dot(name) else {
        return (name, "");
    };
    let (stem, ext) = name.split_at(last);
    if is_one_of(&ext[1..], COMPRESSION_SUFFIXES)
        && let Some(inner) = extension_dot(stem)
        && is_one_of(&stem[inner + 1..], DUMP_FORMATS)
    {
        return name.split_at(inner);
    }
    (stem, ext)
}

fn is_one_of(suffix: &str, known: &[&str]) -> bool {
    known.iter().any(|k| suffix.eq_ignore_ascii_case(k))
}

fn extension_dot(name: &str) -> Option<usize> {
    name.rfind('.')
        .filter(|&pos| name[..pos].chars().any(|c| c != '.'))
}

/// Applies a basename override, keeping the extension of the detected name.
///
/// An empty override counts as no override.
#[must_use]
pub fn apply_basename(detected: &str, basename: Option<&str>) -> String {
    match basename.filter(|name| !name.is_empty()) {
        Some(name) => {
            let (_, ext) = split_dump_extension(detected);
            format!("{name}{ext}")
        }
        None => detected.to_string(),
    }
}

/// Formats `now` with the strftime pattern `format`.
///
/// # Errors
///
/// Returns [`BackupError::InvalidPrefixFormat`] for unknown specifiers.
pub fn date_prefix(format: &str, now: DateTime<Utc>) -> Result<String, BackupError> {
    let invalid = || BackupError::InvalidPrefixFormat {
        format: format.to_string(),
    };
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    let mut prefix = String::new();
    write!(prefix, "{}", now.format_with_items(items.iter())).map_err(|_| invalid())?;
    Ok(prefix)
}

/// Resolves where the dump goes inside `dir`.
///
/// Without `overwrite_existing`, an existing regular file at the candidate
/// path is left alone and the first free `<stem>_(n)<ext>` is used instead.
#[must_use]
pub fn resolve_output_path(dir: &Path, filename: &str, overwrite_existing: bool) -> PathBuf {
    let candidate = dir.join(filename);
    if overwrite_existing || !candidate.is_file() {
        return candidate;
    }

    warn!(
        "File {} already exists, to overwrite it use --overwrite-existing",
        candidate.display()
    );

    let (stem, ext) = split_dump_extension(filename);
    let mut n: u64 = 1;
    loop {
        let alternate = dir.join(format!("{stem}_({n}){ext}"));
        if !alternate.is_file() {
            return alternate;
        }
        n += 1;
    }
}
