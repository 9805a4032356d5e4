//! Error types for the download module.
//!
//! This module defines structured errors for fetch and download operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a URL or writing its body to disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to fetch.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Any response other than `200 OK`.
    ///
    /// The full response body is read and kept for diagnostics.
    #[error("HTTP {status_line} fetching {url}: {body}")]
    HttpStatus {
        /// The URL that returned a non-200 status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Status code plus canonical reason, e.g. `404 Not Found`.
        status_line: String,
        /// Response body text.
        body: String,
    },

    /// File system error (existence check, create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The operation was cancelled through its cancellation token.
    #[error("cancelled fetching {url}")]
    Cancelled {
        /// The URL whose fetch was interrupted.
        url: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a transport error, promoting reqwest timeouts to [`Self::Timeout`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates a non-200 status error.
    ///
    /// The status line is derived from the code and its canonical reason.
    pub fn http_status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let status_line = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .map_or_else(|| status.to_string(), |reason| format!("{status} {reason}"));
        Self::HttpStatus {
            url: url.into(),
            status,
            status_line,
            body: body.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns the HTTP status code if this is a non-200 response error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the error came from cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error does not carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://example.com/a.torrent");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/a.torrent"));
    }

    #[test]
    fn test_download_error_http_status_embeds_status_line_and_body() {
        let error = DownloadError::http_status("https://example.com/x.jpg", 404, "no such file");
        let msg = error.to_string();
        assert!(msg.contains("404 Not Found"), "Expected status line in: {msg}");
        assert!(msg.contains("no such file"), "Expected body in: {msg}");
        assert!(msg.contains("https://example.com/x.jpg"), "Expected URL in: {msg}");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_download_error_http_status_unknown_code_has_bare_status_line() {
        let error = DownloadError::http_status("https://example.com/", 599, "");
        match error {
            DownloadError::HttpStatus { status_line, .. } => assert_eq!(status_line, "599"),
            other => panic!("Expected HttpStatus, got: {other:?}"),
        }
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/abc/metadata.json"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/abc/metadata.json"), "Expected path in: {msg}");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_download_error_invalid_url_display() {
        let error = DownloadError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_cancelled_is_flagged() {
        let error = DownloadError::cancelled("https://example.com/");
        assert!(error.is_cancelled());
        assert!(!DownloadError::timeout("https://example.com/").is_cancelled());
    }
}
