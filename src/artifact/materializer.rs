//! Writes one artifact's metadata and downloads its files.

use std::path::Path;

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{ArtifactFailure, FailureReason, FileTarget, MaterializeError};
use super::Artifact;
use crate::download::filename::is_safe_filename_segment;
use crate::download::{DownloadOutcome, HttpClient, file_name_from_url};

/// File name of the per-artifact metadata record.
pub const METADATA_FILE: &str = "metadata.json";

/// Subdirectory holding secondary images.
pub const EXTRA_IMAGE_DIR: &str = "extrafanart";

/// Maximum concurrent secondary-image downloads within one artifact.
pub const EXTRA_IMAGE_CONCURRENCY: usize = 8;

/// Counts of what a successful materialization did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Files fetched from the network.
    pub downloaded: usize,
    /// Files already on disk and left untouched.
    pub skipped: usize,
}

impl MaterializeReport {
    fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Materializes artifacts under a base directory using a shared client.
#[derive(Debug, Clone)]
pub struct Materializer {
    client: HttpClient,
}

impl Materializer {
    /// Creates a materializer that downloads through `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Writes `<base_dir>/<id>/metadata.json` and downloads the artifact's
    /// torrent, primary image and secondary images.
    ///
    /// Every target is attempted even when others fail. Files that already
    /// exist are skipped, so a later run completes what this one could not.
    /// An artifact without a primary image skips the thumbnail with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::InvalidId`] when the ID cannot name a
    /// directory, and [`MaterializeError::Partial`] listing every target that
    /// failed otherwise.
    #[instrument(skip(self, artifact, cancel), fields(id = %artifact.id))]
    pub async fn materialize(
        &self,
        artifact: &Artifact,
        base_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MaterializeReport, MaterializeError> {
        if !is_safe_filename_segment(&artifact.id) {
            return Err(MaterializeError::InvalidId {
                id: artifact.id.clone(),
            });
        }
        debug!(name = %artifact.name, "materializing artifact");

        let dir = base_dir.join(&artifact.id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            return Err(MaterializeError::Partial {
                id: artifact.id.clone(),
                failures: vec![ArtifactFailure::io(
                    FileTarget::Directory(dir.clone()),
                    &dir,
                    e,
                )],
            });
        }

        let mut report = MaterializeReport::default();
        let mut failures = Vec::new();

        if let Err(failure) = write_metadata(artifact, &dir).await {
            failures.push(failure);
        }

        let (torrent, thumbnail, extras) = tokio::join!(
            self.download_file(FileTarget::Torrent, &artifact.torrent_url, &dir, cancel),
            self.download_thumbnail(artifact, &dir, cancel),
            self.download_extra_images(artifact, &dir, cancel),
        );

        let results = std::iter::once(torrent)
            .chain(thumbnail)
            .chain(extras);
        for result in results {
            match result {
                Ok(outcome) => report.record(outcome),
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            return Err(MaterializeError::Partial {
                id: artifact.id.clone(),
                failures,
            });
        }

        info!(
            name = %artifact.name,
            downloaded = report.downloaded,
            skipped = report.skipped,
            "artifact downloaded"
        );
        Ok(report)
    }

    async fn download_thumbnail(
        &self,
        artifact: &Artifact,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Option<Result<DownloadOutcome, ArtifactFailure>> {
        if artifact.image_url.is_empty() {
            warn!("artifact has no primary image, skipping thumbnail");
            return None;
        }
        Some(
            self.download_file(FileTarget::Thumbnail, &artifact.image_url, dir, cancel)
                .await,
        )
    }

    async fn download_extra_images(
        &self,
        artifact: &Artifact,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Vec<Result<DownloadOutcome, ArtifactFailure>> {
        if artifact.extra_image_urls.is_empty() {
            return Vec::new();
        }

        let extra_dir = dir.join(EXTRA_IMAGE_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&extra_dir).await {
            return vec![Err(ArtifactFailure::io(
                FileTarget::Directory(extra_dir.clone()),
                &extra_dir,
                e,
            ))];
        }

        let mut results: Vec<(usize, Result<DownloadOutcome, ArtifactFailure>)> =
            stream::iter(artifact.extra_image_urls.iter().cloned().enumerate())
                .map(|(index, url)| {
                    let extra_dir = extra_dir.to_path_buf();
                    let cancel = cancel.clone();
                    async move {
                        let result = self
                            .download_file(
                                FileTarget::ExtraImage { index },
                                &url,
                                &extra_dir,
                                &cancel,
                            )
                            .await;
                        (index, result)
                    }
                })
                .buffer_unordered(EXTRA_IMAGE_CONCURRENCY)
                .collect()
                .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    async fn download_file(
        &self,
        target: FileTarget,
        url: &str,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, ArtifactFailure> {
        let Some(file_name) = file_name_from_url(url) else {
            return Err(ArtifactFailure::new(
                target,
                FailureReason::NoFileName {
                    url: url.to_string(),
                },
            ));
        };
        self.client
            .download_to(&dir.join(file_name), url, &[], cancel)
            .await
            .map_err(|e| ArtifactFailure::new(target, e))
    }
}

async fn write_metadata(artifact: &Artifact, dir: &Path) -> Result<(), ArtifactFailure> {
    let raw = artifact
        .to_metadata_json()
        .map_err(|e| ArtifactFailure::new(FileTarget::Metadata, e))?;
    let path = dir.join(METADATA_FILE);
    tokio::fs::write(&path, raw)
        .await
        .map_err(|e| ArtifactFailure::io(FileTarget::Metadata, &path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artifact_for(server: &MockServer, id: &str, extras: usize) -> Artifact {
        Artifact {
            id: id.to_string(),
            name: format!("{id} name"),
            size: "1 GB".to_string(),
            time: "2022-03-11".to_string(),
            torrent_url: format!("{}/torrent/{id}.torrent", server.uri()),
            image_url: format!("{}/img/{id}.jpg", server.uri()),
            extra_image_urls: (0..extras)
                .map(|i| format!("{}/img/{id}-{i}.jpg", server.uri()))
                .collect(),
            ..Artifact::default()
        }
    }

    async fn serve_ok(server: &MockServer) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes".to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_materialize_writes_full_layout() {
        let server = MockServer::start().await;
        serve_ok(&server).await;
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_for(&server, "ABC-123", 2);

        let materializer = Materializer::new(HttpClient::new().unwrap());
        let report = materializer
            .materialize(&artifact, temp_dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        let dir = temp_dir.path().join("ABC-123");
        assert_eq!(report.downloaded, 4);
        assert!(dir.join(METADATA_FILE).is_file());
        assert!(dir.join("ABC-123.torrent").is_file());
        assert!(dir.join("ABC-123.jpg").is_file());
        assert!(dir.join(EXTRA_IMAGE_DIR).join("ABC-123-0.jpg").is_file());
        assert!(dir.join(EXTRA_IMAGE_DIR).join("ABC-123-1.jpg").is_file());

        let written = std::fs::read(dir.join(METADATA_FILE)).unwrap();
        assert_eq!(Artifact::from_metadata_json(&written).unwrap(), artifact);
    }

    #[tokio::test]
    async fn test_materialize_without_extras_creates_no_extrafanart() {
        let server = MockServer::start().await;
        serve_ok(&server).await;
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_for(&server, "NOX-1", 0);

        let materializer = Materializer::new(HttpClient::new().unwrap());
        materializer
            .materialize(&artifact, temp_dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!temp_dir.path().join("NOX-1").join(EXTRA_IMAGE_DIR).exists());
    }

    #[tokio::test]
    async fn test_materialize_second_run_skips_existing_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes".to_vec()))
            .expect(3)
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_for(&server, "RPT-7", 1);
        let materializer = Materializer::new(HttpClient::new().unwrap());
        let cancel = CancellationToken::new();

        let first = materializer
            .materialize(&artifact, temp_dir.path(), &cancel)
            .await
            .unwrap();
        let second = materializer
            .materialize(&artifact, temp_dir.path(), &cancel)
            .await
            .unwrap();

        assert_eq!(first.downloaded, 3);
        assert_eq!(second, MaterializeReport { downloaded: 0, skipped: 3 });
    }

    #[tokio::test]
    async fn test_materialize_collects_failures_and_attempts_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/BAD-1.jpg"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no thumb"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/BAD-1-1.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        serve_ok(&server).await;

        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_for(&server, "BAD-1", 3);
        let materializer = Materializer::new(HttpClient::new().unwrap());

        let error = materializer
            .materialize(&artifact, temp_dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        let targets: Vec<&FileTarget> = error.failures().iter().map(|f| &f.target).collect();
        assert_eq!(
            targets,
            vec![&FileTarget::Thumbnail, &FileTarget::ExtraImage { index: 1 }]
        );
        assert!(error.to_string().contains("thumbnail"), "{error}");

        let dir = temp_dir.path().join("BAD-1");
        assert!(dir.join(METADATA_FILE).is_file());
        assert!(dir.join("BAD-1.torrent").is_file());
        assert!(!dir.join("BAD-1.jpg").exists());
        assert!(dir.join(EXTRA_IMAGE_DIR).join("BAD-1-0.jpg").is_file());
        assert!(dir.join(EXTRA_IMAGE_DIR).join("BAD-1-2.jpg").is_file());
    }

    #[tokio::test]
    async fn test_materialize_missing_primary_image_is_not_a_failure() {
        let server = MockServer::start().await;
        serve_ok(&server).await;
        let temp_dir = TempDir::new().unwrap();
        let mut artifact = artifact_for(&server, "NOIMG-2", 0);
        artifact.image_url.clear();

        let materializer = Materializer::new(HttpClient::new().unwrap());
        let report = materializer
            .materialize(&artifact, temp_dir.path(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.downloaded, 1);
    }

    #[tokio::test]
    async fn test_materialize_url_without_file_name_fails_that_target() {
        let server = MockServer::start().await;
        serve_ok(&server).await;
        let temp_dir = TempDir::new().unwrap();
        let mut artifact = artifact_for(&server, "DIR-3", 0);
        artifact.torrent_url = format!("{}/torrent/", server.uri());

        let materializer = Materializer::new(HttpClient::new().unwrap());
        let error = materializer
            .materialize(&artifact, temp_dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.failures().len(), 1);
        assert_eq!(error.failures()[0].target, FileTarget::Torrent);
        assert!(temp_dir.path().join("DIR-3").join("DIR-3.jpg").is_file());
    }

    #[tokio::test]
    async fn test_materialize_rejects_unusable_ids() {
        let temp_dir = TempDir::new().unwrap();
        let materializer = Materializer::new(HttpClient::new().unwrap());
        let cancel = CancellationToken::new();

        for id in ["", "..", "a/b"] {
            let artifact = Artifact {
                id: id.to_string(),
                ..Artifact::default()
            };
            let result = materializer
                .materialize(&artifact, temp_dir.path(), &cancel)
                .await;
            assert!(
                matches!(result, Err(MaterializeError::InvalidId { .. })),
                "id {id:?} should be rejected"
            );
        }
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
