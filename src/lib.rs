//! Catalog Spider Library
//!
//! Crawls a paginated catalog site, extracts one artifact record per list
//! card, and materializes each artifact on disk: its metadata, torrent file,
//! primary image and secondary images. A bounded worker pool does the
//! downloads while a single producer walks the list pages.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - HTTP fetching and idempotent streaming downloads
//! - [`extract`] - List-page parsing into artifacts and a next-page flag
//! - [`pagination`] - Cursor over list pages
//! - [`artifact`] - The artifact record and its on-disk materialization
//! - [`pipeline`] - Producer plus fixed worker pool over a bounded queue
//! - [`config`] - Explicit crawl configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod config;
pub mod download;
pub mod extract;
pub mod pagination;
pub mod pipeline;
mod user_agent;

// Re-export commonly used types
pub use artifact::{Artifact, MaterializeError, Materializer};
pub use config::{CrawlConfig, CrawlError, DEFAULT_OUTPUT_DIR};
pub use download::{DownloadError, DownloadOutcome, HttpClient, RequestModifier};
pub use extract::{ExtractError, ExtractedPage, extract_page};
pub use pagination::{CursorError, HttpPageSource, PageCursor, PageSource, next_page_url};
pub use pipeline::{CrawlEngine, CrawlStats, DEFAULT_CONCURRENCY, EngineError};
