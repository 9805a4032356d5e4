//! Explicit crawl configuration and the wiring that runs it.

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::artifact::Materializer;
use crate::download::{DownloadError, HttpClient, RequestModifier};
use crate::pagination::HttpPageSource;
use crate::pipeline::{CrawlEngine, CrawlStats, DEFAULT_CONCURRENCY, EngineError};

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Errors from running a configured crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The HTTP client could not be built.
    #[error("failed to set up HTTP client: {0}")]
    Client(#[source] DownloadError),

    /// The crawl engine rejected its settings or failed to orchestrate.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Everything one crawl needs.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// First list page.
    pub start_url: Url,
    /// Root under which artifact directories are created.
    pub output_dir: PathBuf,
    /// Number of concurrent artifact workers (1-100).
    pub concurrency: usize,
    /// Maximum artifacts to queue; `None` is unlimited.
    pub limit: Option<usize>,
    /// Maximum list pages to walk; `None` is unlimited.
    pub max_pages: Option<usize>,
    /// Cookies and headers attached to every request.
    pub modifiers: Vec<RequestModifier>,
}

impl CrawlConfig {
    /// Creates a config with default output, concurrency and no limit.
    #[must_use]
    pub fn new(start_url: Url) -> Self {
        Self {
            start_url,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            limit: None,
            max_pages: None,
            modifiers: Vec::new(),
        }
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the item limit.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the request modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Vec<RequestModifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Builds the client, page source, materializer and engine, then crawls.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the HTTP client cannot be built and
    /// [`CrawlError::Engine`] for invalid concurrency or orchestration
    /// failures. Per-artifact failures are only counted in the stats.
    #[instrument(skip_all, fields(start_url = %self.start_url))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<CrawlStats, CrawlError> {
        let engine =
            CrawlEngine::new(self.concurrency, self.limit)?.with_max_pages(self.max_pages);
        let client =
            HttpClient::with_modifiers(self.modifiers.clone()).map_err(CrawlError::Client)?;
        debug!(modifiers = self.modifiers.len(), "HTTP client ready");

        let source = HttpPageSource::new(client.clone());
        let materializer = Materializer::new(client);
        let stats = engine
            .run(
                &source,
                self.start_url.clone(),
                &self.output_dir,
                &materializer,
                cancel,
            )
            .await?;
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CrawlConfig::new(Url::parse("https://example.com/list").unwrap());
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.limit, None);
        assert_eq!(config.max_pages, None);
        assert!(config.modifiers.is_empty());
    }

    #[test]
    fn test_config_builders_override_defaults() {
        let config = CrawlConfig::new(Url::parse("https://example.com/list").unwrap())
            .with_output_dir("/tmp/out")
            .with_concurrency(8)
            .with_limit(Some(20))
            .with_max_pages(Some(5))
            .with_modifiers(vec![RequestModifier::cookie("over18", "1")]);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.limit, Some(20));
        assert_eq!(config.max_pages, Some(5));
        assert_eq!(config.modifiers.len(), 1);
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_concurrency_before_network() {
        let config = CrawlConfig::new(Url::parse("http://127.0.0.1:9/list").unwrap())
            .with_concurrency(0);
        let err = config.run(&CancellationToken::new()).await.unwrap_err();
        assert!(
            matches!(err, CrawlError::Engine(EngineError::InvalidConcurrency { value: 0 })),
            "{err}"
        );
    }
}
