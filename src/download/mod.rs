//! HTTP fetching and idempotent file downloads.
//!
//! This module provides the [`HttpClient`] used both for list pages and for
//! artifact files.
//!
//! # Features
//!
//! - Exactly-200 success policy; other statuses carry status line and body
//! - Request modifiers (cookies, headers) per client and per call
//! - Skip-if-exists downloads (the destination path is the idempotence marker)
//! - Streaming writes (memory-efficient for large files)
//! - Cancellation through a shared [`tokio_util::sync::CancellationToken`]
//!
//! # Example
//!
//! ```no_run
//! use catalog_spider::download::HttpClient;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! client
//!     .download_to(Path::new("./cover.jpg"), "https://example.com/cover.jpg", &[], &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
pub(crate) mod filename;
mod modifier;

pub use client::{DownloadOutcome, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::file_name_from_url;
pub use modifier::RequestModifier;
