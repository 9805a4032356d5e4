//! Error types for artifact materialization.
//!
//! Materializing one artifact attempts every file independently, so the
//! result is an aggregate: one [`ArtifactFailure`] per target that failed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;

/// Which part of an artifact's directory a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// The artifact directory or its `extrafanart/` subdirectory.
    Directory(PathBuf),
    /// `metadata.json`.
    Metadata,
    /// The torrent file.
    Torrent,
    /// The primary image.
    Thumbnail,
    /// A secondary image, by position in the artifact's list.
    ExtraImage {
        /// Zero-based index into `extra_image_urls`.
        index: usize,
    },
}

impl fmt::Display for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(path) => write!(f, "directory {}", path.display()),
            Self::Metadata => f.write_str("metadata"),
            Self::Torrent => f.write_str("torrent"),
            Self::Thumbnail => f.write_str("thumbnail"),
            Self::ExtraImage { index } => write!(f, "extra image #{index}"),
        }
    }
}

/// Why a single target failed.
#[derive(Debug, Error)]
pub enum FailureReason {
    /// Fetching or writing the file failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A local filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path being created or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata could not be serialized.
    #[error("cannot serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The source URL has no usable last path segment to name the file.
    #[error("no file name in URL {url:?}")]
    NoFileName {
        /// The offending URL.
        url: String,
    },
}

/// One failed target within an artifact.
#[derive(Debug, Error)]
#[error("{target}: {reason}")]
pub struct ArtifactFailure {
    /// What was being produced.
    pub target: FileTarget,
    /// Why it failed.
    #[source]
    pub reason: FailureReason,
}

impl ArtifactFailure {
    /// Creates a failure for `target`.
    pub fn new(target: FileTarget, reason: impl Into<FailureReason>) -> Self {
        Self {
            target,
            reason: reason.into(),
        }
    }

    /// Creates a filesystem failure for `target` at `path`.
    pub fn io(target: FileTarget, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(
            target,
            FailureReason::Io {
                path: path.into(),
                source,
            },
        )
    }

    /// Returns true if the failure was a cancelled fetch.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(&self.reason, FailureReason::Download(e) if e.is_cancelled())
    }
}

/// Errors from materializing one artifact.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The ID is empty or not a single safe path component.
    #[error("artifact id {id:?} cannot be used as a directory name")]
    InvalidId {
        /// The rejected ID.
        id: String,
    },

    /// One or more targets failed; every other target was still attempted.
    #[error("artifact {id}: {} of its files failed: {}", .failures.len(), summarize(.failures))]
    Partial {
        /// The artifact's ID.
        id: String,
        /// Every failure, in target order.
        failures: Vec<ArtifactFailure>,
    },
}

impl MaterializeError {
    /// Returns the individual failures (empty for [`Self::InvalidId`]).
    #[must_use]
    pub fn failures(&self) -> &[ArtifactFailure] {
        match self {
            Self::InvalidId { .. } => &[],
            Self::Partial { failures, .. } => failures,
        }
    }
}

fn summarize(failures: &[ArtifactFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
