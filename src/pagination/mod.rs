//! Pagination over list pages.
//!
//! A [`PageCursor`] is one fetched and extracted list page. Advancing never
//! mutates a cursor: [`PageCursor::next`] fetches the successor page and
//! returns a new cursor, or [`CursorError::LastPage`] once the current page
//! offers no further page. How a page is loaded is abstracted behind
//! [`PageSource`].

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::artifact::Artifact;
use crate::download::{DownloadError, HttpClient};
use crate::extract::{ExtractError, ExtractedPage, extract_page};

/// Query parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page";

/// Errors from loading or advancing a cursor.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The current page is the last one. A normal termination signal.
    #[error("no more pages")]
    LastPage,

    /// The current URL carries a `page` value that is not a page number.
    #[error("invalid page parameter '{value}' in {url}")]
    InvalidPageParam {
        /// The URL being advanced.
        url: String,
        /// The offending value.
        value: String,
    },

    /// Fetching a list page failed.
    #[error("failed to fetch list page: {0}")]
    Fetch(#[from] DownloadError),

    /// Extracting a list page failed.
    #[error("failed to extract list page: {0}")]
    Extract(#[from] ExtractError),
}

impl CursorError {
    /// Returns true for the end-of-pagination signal.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        matches!(self, Self::LastPage)
    }

    /// Returns true if loading was interrupted by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_cancelled())
    }
}

/// Loads one list page and extracts it.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches and extracts the page at `url`.
    async fn load(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<ExtractedPage, CursorError>;
}

/// [`PageSource`] that fetches over HTTP and extracts with [`extract_page`].
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: HttpClient,
}

impl HttpPageSource {
    /// Creates a page source over `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn load(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<ExtractedPage, CursorError> {
        let html = self.client.fetch_text(url.as_str(), &[], cancel).await?;
        Ok(extract_page(&html, url)?)
    }
}

/// One loaded list page.
#[derive(Debug, Clone)]
pub struct PageCursor {
    url: Url,
    page: ExtractedPage,
}

impl PageCursor {
    /// Loads the first page at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Fetch`] or [`CursorError::Extract`] if the page
    /// cannot be loaded.
    #[instrument(skip(source, url, cancel), fields(url = %url))]
    pub async fn fetch(
        source: &dyn PageSource,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<Self, CursorError> {
        info!("fetching list page");
        let page = source.load(&url, cancel).await?;
        info!(
            artifacts = page.artifacts.len(),
            has_next_page = page.has_next_page,
            "list page loaded"
        );
        Ok(Self { url, page })
    }

    /// Artifacts on this page, in document order.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.page.artifacts
    }

    /// Whether a further page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page.has_next_page
    }

    /// URL this page was loaded from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Loads the page after this one.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::LastPage`] when this page is the last one,
    /// [`CursorError::InvalidPageParam`] if the current page number is not
    /// numeric, and fetch or extract errors from loading the successor.
    pub async fn next(
        &self,
        source: &dyn PageSource,
        cancel: &CancellationToken,
    ) -> Result<Self, CursorError> {
        if !self.has_next() {
            debug!(url = %self.url, "last page reached");
            return Err(CursorError::LastPage);
        }
        let next_url = next_page_url(&self.url)?;
        Self::fetch(source, next_url, cancel).await
    }
}

/// Returns a copy of `url` with its `page` parameter incremented.
///
/// A missing or empty `page` counts as page 1. Other query pairs keep their
/// order; the page pair keeps its position or is appended.
///
/// # Errors
///
/// Returns [`CursorError::InvalidPageParam`] if the existing value is not a
/// non-negative integer.
pub fn next_page_url(url: &Url) -> Result<Url, CursorError> {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let current = match pairs.iter().find(|(key, _)| key == PAGE_PARAM) {
        Some((_, value)) if !value.is_empty() => {
            value
                .parse::<u64>()
                .map_err(|_| CursorError::InvalidPageParam {
                    url: url.to_string(),
                    value: value.clone(),
                })?
        }
        _ => 1,
    };
    let next = current
        .checked_add(1)
        .ok_or_else(|| CursorError::InvalidPageParam {
            url: url.to_string(),
            value: current.to_string(),
        })?
        .to_string();

    let mut next_url = url.clone();
    {
        let mut query = next_url.query_pairs_mut();
        query.clear();
        let mut placed = false;
        for (key, value) in &pairs {
            if key == PAGE_PARAM {
                if !placed {
                    query.append_pair(PAGE_PARAM, &next);
                    placed = true;
                }
            } else {
                query.append_pair(key, value);
            }
        }
        if !placed {
            query.append_pair(PAGE_PARAM, &next);
        }
    }
    Ok(next_url)
}
