//! Crawl engine: one pagination producer feeding a fixed worker pool.
//!
//! # Example
//!
//! ```no_run
//! use catalog_spider::artifact::Materializer;
//! use catalog_spider::download::HttpClient;
//! use catalog_spider::pagination::HttpPageSource;
//! use catalog_spider::pipeline::CrawlEngine;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let source = HttpPageSource::new(client.clone());
//! let materializer = Materializer::new(client);
//! let engine = CrawlEngine::new(4, Some(50))?;
//! let stats = engine
//!     .run(
//!         &source,
//!         Url::parse("https://catalog.example.com/2022/03/11")?,
//!         Path::new("./output"),
//!         &materializer,
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("completed: {}, failed: {}", stats.completed(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::artifact::{Artifact, ArtifactFailure, Materializer};
use crate::pagination::{CursorError, PageCursor, PageSource};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Error type for crawl engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The output root could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// The output root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Walking the list pages failed; already queued artifacts were still
    /// processed.
    #[error("pagination stopped: {0}")]
    Pagination(#[source] CursorError),

    /// The run was cancelled; already queued artifacts were drained.
    #[error("crawl cancelled")]
    Cancelled,

    /// Every worker exited while the producer still had artifacts.
    #[error("worker queue closed unexpectedly")]
    QueueClosed,
}

impl From<CursorError> for EngineError {
    fn from(error: CursorError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Pagination(error)
        }
    }
}

/// Statistics from one crawl run.
///
/// Atomic counters, updated by the producer and by concurrent workers.
#[derive(Debug, Default)]
pub struct CrawlStats {
    queued: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl CrawlStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of artifacts handed to the workers.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Returns the number of fully materialized artifacts.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of artifacts with at least one failed file.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn increment_queued(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Self {
        Self {
            queued: AtomicUsize::new(self.queued()),
            completed: AtomicUsize::new(self.completed()),
            failed: AtomicUsize::new(self.failed()),
        }
    }
}

/// Crawl engine with a fixed worker pool and an optional global item limit.
///
/// # Concurrency Model
///
/// - The producer walks pages on the calling task
/// - `concurrency` long-lived workers share one bounded queue of the same
///   capacity; the producer waits while the queue is full
/// - A failed artifact is logged and counted; its worker moves on
/// - `run` returns only after the queue is closed and every worker exited
#[derive(Debug, Clone)]
pub struct CrawlEngine {
    concurrency: usize,
    limit: Option<usize>,
    max_pages: Option<usize>,
}

impl CrawlEngine {
    /// Creates an engine with `concurrency` workers that queues at most
    /// `limit` artifacts (`None` means unlimited).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize, limit: Option<usize>) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            concurrency,
            limit,
            max_pages: None,
        })
    }

    /// Stops the walk after `max_pages` list pages (`None` means no cap).
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured item limit.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the configured page cap.
    #[must_use]
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Crawls from `start_url` and materializes every discovered artifact
    /// under `output_dir`.
    ///
    /// Artifacts are queued in page order until the limit is reached, the
    /// last page or the page cap is done, or a page yields no artifacts.
    ///
    /// # Errors
    ///
    /// - [`EngineError::OutputDir`] if `output_dir` cannot be created
    /// - [`EngineError::Pagination`] if a list page cannot be loaded
    /// - [`EngineError::Cancelled`] if `cancel` fired
    ///
    /// Per-artifact failures do NOT cause this method to error; they are
    /// logged and counted in the returned stats.
    #[instrument(skip_all, fields(start_url = %start_url, output_dir = %output_dir.display()))]
    pub async fn run(
        &self,
        source: &dyn PageSource,
        start_url: Url,
        output_dir: &Path,
        materializer: &Materializer,
        cancel: &CancellationToken,
    ) -> Result<CrawlStats, EngineError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| EngineError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        info!(
            concurrency = self.concurrency,
            limit = ?self.limit,
            max_pages = ?self.max_pages,
            "starting crawl"
        );

        let stats = Arc::new(CrawlStats::new());
        let (tx, rx) = mpsc::channel::<Artifact>(self.concurrency);
        let rx = Arc::new(Mutex::new(rx));

        let workers: Vec<JoinHandle<()>> = (0..self.concurrency)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&rx),
                    materializer.clone(),
                    output_dir.to_path_buf(),
                    Arc::clone(&stats),
                    cancel.clone(),
                ))
            })
            .collect();

        let produced = self.produce(source, start_url, &tx, &stats, cancel).await;
        drop(tx);

        debug!(workers = workers.len(), "waiting for workers to drain");
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "crawl worker panicked");
            }
        }

        info!(
            queued = stats.queued(),
            completed = stats.completed(),
            failed = stats.failed(),
            "crawl finished"
        );

        produced?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(stats.snapshot())
    }

    async fn produce(
        &self,
        source: &dyn PageSource,
        start_url: Url,
        tx: &mpsc::Sender<Artifact>,
        stats: &CrawlStats,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if self.limit == Some(0) {
            return Ok(());
        }

        let mut cursor = PageCursor::fetch(source, start_url, cancel).await?;
        let mut count = 0usize;
        let mut pages = 1usize;
        loop {
            if cursor.artifacts().is_empty() {
                info!(url = %cursor.url(), "page has no artifacts, stopping");
                return Ok(());
            }

            for artifact in cursor.artifacts() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(EngineError::Cancelled),
                    sent = tx.send(artifact.clone()) => {
                        sent.map_err(|_| EngineError::QueueClosed)?;
                    }
                }
                stats.increment_queued();
                count += 1;
                if self.limit.is_some_and(|limit| count >= limit) {
                    info!(count, "item limit reached, stopping");
                    return Ok(());
                }
            }

            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if self.max_pages.is_some_and(|max| pages >= max) {
                info!(pages, count, "page cap reached, stopping");
                return Ok(());
            }
            cursor = match cursor.next(source, cancel).await {
                Ok(next) => {
                    pages += 1;
                    next
                }
                Err(CursorError::LastPage) => {
                    info!(count, "last page reached");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
        }
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<Artifact>>>,
    materializer: Materializer,
    output_dir: PathBuf,
    stats: Arc<CrawlStats>,
    cancel: CancellationToken,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(artifact) = next else {
            break;
        };

        if cancel.is_cancelled() {
            debug!(worker, id = %artifact.id, "cancelled, dropping queued artifact");
            continue;
        }

        match materializer
            .materialize(&artifact, &output_dir, &cancel)
            .await
        {
            Ok(report) => {
                debug!(
                    worker,
                    id = %artifact.id,
                    downloaded = report.downloaded,
                    skipped = report.skipped,
                    "artifact done"
                );
                stats.increment_completed();
            }
            Err(e) if e.failures().iter().any(ArtifactFailure::is_cancelled) => {
                debug!(worker, id = %artifact.id, "artifact interrupted by cancellation");
                stats.increment_failed();
            }
            Err(e) => {
                warn!(worker, id = %artifact.id, error = %e, "failed to download artifact, skipping");
                stats.increment_failed();
            }
        }
    }
    debug!(worker, "worker exiting");
}
