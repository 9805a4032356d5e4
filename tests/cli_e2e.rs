//! End-to-end CLI tests for the catalog-spider binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::catalog_site::{
    card_html, list_page_html, list_url, mount_artifact_files, mount_list_page,
};
use tempfile::TempDir;
use wiremock::MockServer;

fn spider() -> Command {
    Command::cargo_bin("catalog-spider").unwrap()
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    spider()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawl a paginated catalog"))
        .stdout(predicate::str::contains("popular"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    spider()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog-spider"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    spider()
        .args(["--invalid-flag", "date"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that a missing subcommand causes non-zero exit.
#[test]
fn test_binary_without_subcommand_fails() {
    spider().assert().failure();
}

#[test]
fn test_binary_concurrency_out_of_range_fails() {
    spider()
        .args(["-c", "0", "date"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_unknown_popular_range_fails() {
    spider()
        .args(["-H", "example.com", "popular", "14"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("7, 30, 60"));
}

#[test]
fn test_binary_date_without_host_fails() {
    spider()
        .args(["date", "2022-3-11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--host"));
}

#[test]
fn test_binary_bad_date_fails() {
    spider()
        .args(["-H", "example.com", "date", "2022-02-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("calendar date"));
}

#[test]
fn test_binary_unresolvable_host_fails() {
    spider()
        .args(["-H", "no-such-host.invalid", "date", "2022-3-11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown host"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_url_command_crawls_into_output() {
    let server = MockServer::start().await;
    let page = list_page_html(
        &[card_html("CLI-1", true, 1), card_html("CLI-2", true, 0)],
        false,
    );
    mount_list_page(&server, 1, page, Some(1)).await;
    mount_artifact_files(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out");

    spider()
        .args(["-q", "-c", "2", "-o"])
        .arg(&output)
        .args(["--cookie", "over18=1", "url"])
        .arg(list_url(&server).as_str())
        .assert()
        .success();

    assert!(output.join("CLI-1/metadata.json").is_file());
    assert!(output.join("CLI-1/CLI-1.torrent").is_file());
    assert!(output.join("CLI-1/extrafanart/CLI-1-1.jpg").is_file());
    assert!(output.join("CLI-2/CLI-2.jpg").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_per_artifact_failures_keep_exit_code_zero() {
    let server = MockServer::start().await;
    // Artifact files are not served, so every download fails with 404
    let page = list_page_html(&[card_html("MISS-1", true, 0)], false);
    mount_list_page(&server, 1, page, None).await;

    let temp_dir = TempDir::new().unwrap();

    spider()
        .arg("-o")
        .arg(temp_dir.path())
        .arg("url")
        .arg(list_url(&server).as_str())
        .assert()
        .success()
        .stdout(predicate::str::contains("MISS-1"));

    assert!(temp_dir.path().join("MISS-1/metadata.json").is_file());
}
