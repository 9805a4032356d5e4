//! HTTP client wrapper for fetching pages and downloading files.
//!
//! This module provides the `HttpClient` struct which issues GET requests with
//! request modifiers, treats anything but `200 OK` as a failure, and streams
//! bodies to disk with skip-if-exists semantics.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::modifier::{RequestModifier, apply_modifiers};
use crate::user_agent;

/// HTTP client for fetching list pages and downloading artifact files.
///
/// This client is designed to be created once and shared by every worker,
/// taking advantage of connection pooling. Cloning is cheap.
///
/// Modifiers given at construction are applied to every request, before the
/// per-call modifiers.
///
/// # Example
///
/// ```no_run
/// use catalog_spider::download::{HttpClient, RequestModifier};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::with_modifiers(vec![RequestModifier::cookie("over18", "1")])?;
/// let cancel = CancellationToken::new();
/// let outcome = client
///     .download_to(Path::new("./a.torrent"), "https://example.com/a.torrent", &[], &cancel)
///     .await?;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    modifiers: Arc<[RequestModifier]>,
}

/// What [`HttpClient::download_to`] did with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The body was fetched and written.
    Downloaded {
        /// Bytes written to disk.
        bytes: u64,
    },
    /// The destination already existed; no request was made.
    Skipped,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and no modifiers.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    /// - Cookie store: enabled (cookies set by the site are replayed)
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the reqwest client cannot be
    /// constructed (e.g. the TLS backend fails to initialize).
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, Vec::new())
    }

    /// Creates a new HTTP client that applies `modifiers` to every request.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::new`].
    #[instrument(level = "debug", skip(modifiers), fields(modifiers = modifiers.len()))]
    pub fn with_modifiers(modifiers: Vec<RequestModifier>) -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, modifiers)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::new`].
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
        modifiers: Vec<RequestModifier>,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self {
            client,
            modifiers: modifiers.into(),
        })
    }

    /// Issues a GET for `url` and returns the response once it is known to be `200 OK`.
    ///
    /// The caller owns the returned body; dropping the response closes it.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server answers anything but 200 (the error carries status line and body)
    /// - `cancel` fires before the response headers arrive
    #[instrument(skip(self, modifiers, cancel), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        modifiers: &[RequestModifier],
        cancel: &CancellationToken,
    ) -> Result<Response, DownloadError> {
        let parsed_url = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let request = apply_modifiers(
            self.client.get(parsed_url),
            self.modifiers.iter().chain(modifiers),
        );

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            sent = request.send() => sent.map_err(|e| DownloadError::transport(url, e))?,
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
                text = response.text() => text.map_err(|e| DownloadError::transport(url, e))?,
            };
            debug!(status = status.as_u16(), "non-200 response");
            return Err(DownloadError::http_status(url, status.as_u16(), body));
        }

        Ok(response)
    }

    /// Fetches `url` and reads the whole body as text.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch`](Self::fetch), plus transport
    /// errors raised while reading the body.
    pub async fn fetch_text(
        &self,
        url: &str,
        modifiers: &[RequestModifier],
        cancel: &CancellationToken,
    ) -> Result<String, DownloadError> {
        let response = self.fetch(url, modifiers, cancel).await?;
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DownloadError::cancelled(url)),
            text = response.text() => text.map_err(|e| DownloadError::transport(url, e)),
        }
    }

    /// Downloads `url` to `dest` unless `dest` already exists.
    ///
    /// An existing destination is a skip, never an overwrite: no request is
    /// made and [`DownloadOutcome::Skipped`] is returned. The file is created
    /// only after a `200 OK` arrived, so HTTP errors leave nothing behind. A
    /// body stream that fails or is cancelled midway removes the partial file,
    /// so the next run fetches it again.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the existence check fails for a reason other
    /// than not-found, if the fetch fails, or if creating or writing the file
    /// fails.
    #[instrument(skip(self, modifiers, cancel), fields(url = %url, path = %dest.display()))]
    pub async fn download_to(
        &self,
        dest: &Path,
        url: &str,
        modifiers: &[RequestModifier],
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        match tokio::fs::try_exists(dest).await {
            Ok(true) => {
                debug!("destination exists, skipping");
                return Ok(DownloadOutcome::Skipped);
            }
            Ok(false) => {}
            Err(e) => return Err(DownloadError::io(dest, e)),
        }

        let response = self.fetch(url, modifiers, cancel).await?;

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("destination created concurrently, skipping");
                return Ok(DownloadOutcome::Skipped);
            }
            Err(e) => return Err(DownloadError::io(dest, e)),
        };

        let bytes = match stream_to_file(&mut file, response, url, dest, cancel).await {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                debug!(error = %e, "cleaning up partial file after error");
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    warn!(error = %remove_err, "failed to remove partial file");
                }
                return Err(e);
            }
        };
        debug!(bytes, "download complete");

        Ok(DownloadOutcome::Downloaded { bytes })
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = chunk else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
