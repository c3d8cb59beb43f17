//! Filename resolution and destination path selection.
//!
//! Resolution is a pure function of the response headers and the request,
//! so the same inputs always produce the same name. Candidates, first
//! usable one wins:
//!
//! 1. the `filename` parameter of a `Content-Disposition` header;
//! 2. the base name of the destination, when it is not a directory;
//! 3. the last path segment of the URL, when the destination is a directory.

use std::path::{Path, PathBuf};

use url::Url;

/// Parses a Content-Disposition header value and returns the raw filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987)
///
/// Parameter names match case-insensitively. A usable `filename*` wins
/// when both forms are present.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for slicing `header`.
    let lower = header.to_ascii_lowercase();

    if let Some(pos) = lower.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            // An unusable extended value falls through to plain `filename=`.
            if let Some(name) = urlencoding::decode(encoded_name)
                .ok()
                .and_then(|decoded| base_name(decoded.trim()))
            {
                return Some(name);
            }
        }
    }

    let pos = lower.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim_start();
    let raw = if let Some(stripped) = value.strip_prefix('"') {
        stripped.find('"').map_or(stripped, |end| &stripped[..end])
    } else {
        let end = value.find(';').unwrap_or(value.len());
        &value[..end]
    };
    let name = raw.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    (!name.is_empty()).then(|| name.to_string())
}

/// Reduces a candidate to its final path component.
///
/// Backslashes count as separators so `..\evil.exe` cannot escape the
/// destination directory on any platform.
pub(crate) fn base_name(candidate: &str) -> Option<String> {
    let normalized = candidate.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_str()?.to_string();
    is_usable_filename(&name).then_some(name)
}

/// A usable name is non-empty, not a dot segment, and carries no separator.
pub(crate) fn is_usable_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Last non-empty URL path segment, percent-decoded.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.rev().find(|segment| !segment.is_empty())?;
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    base_name(&decoded)
}

/// Resolves the filename for a download.
///
/// Returns `None` when no candidate is usable; the engine turns that into
/// [`DownloadError::UnresolvableFilename`](super::DownloadError::UnresolvableFilename).
pub(crate) fn resolve_filename(
    content_disposition: Option<&str>,
    destination: &Path,
    destination_is_dir: bool,
    url: &Url,
) -> Option<String> {
    if let Some(name) = content_disposition
        .and_then(parse_content_disposition)
        .and_then(|name| base_name(&name))
    {
        return Some(name);
    }

    if destination_is_dir {
        filename_from_url(url)
    } else {
        destination.to_str().and_then(base_name)
    }
}

/// The path the finished file is moved to.
pub(crate) fn final_destination(
    destination: &Path,
    destination_is_dir: bool,
    filename: &str,
) -> PathBuf {
    if destination_is_dir {
        destination.join(filename)
    } else {
        destination.to_path_buf()
    }
}

/// Directory that holds the staging file.
///
/// Always the directory the final file lands in, so the closing rename
/// never crosses a filesystem boundary.
pub(crate) fn staging_dir(destination: &Path, destination_is_dir: bool) -> PathBuf {
    if destination_is_dir {
        return destination.to_path_buf();
    }
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
