//! Filename extraction and sanitization for downloaded artifact files.
//!
//! On-disk names come from the last path segment of the source URL, so a
//! later run maps the same URL to the same path and can skip it.

use url::Url;

/// Returns the on-disk file name for `raw_url`: its raw last path segment,
/// query string included, with filesystem-unsafe characters replaced.
///
/// Percent escapes are kept as written so that distinct URLs never collapse
/// onto one path.
///
/// Returns `None` when the URL does not parse or its path ends in `/`.
#[must_use]
pub fn file_name_from_url(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let raw = match url.query() {
        Some(query) => format!("{last}?{query}"),
        None => last.to_string(),
    };
    let name = sanitize_filename(&raw);
    (!name.is_empty()).then_some(name)
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces path separators and control characters, and rewrites the `.`
/// and `..` segments. Everything else is kept byte for byte.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

/// A single path component that cannot climb out of its directory.
pub(crate) fn is_safe_filename_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
