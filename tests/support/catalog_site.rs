//! A fake catalog site on a wiremock server.
//!
//! List pages live at `/list` (page 1) and `/list?page=N`. Card links are
//! relative: torrents under `/t/`, images under `/i/`.

#![allow(dead_code)]

use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the first list page.
pub const LIST_PATH: &str = "/list";

/// Card markup for `id` with one thumbnail and `extras` secondary images.
pub fn card_html(id: &str, with_torrent: bool, extras: usize) -> String {
    let mut images = format!(r#"<div class="column"><img src="/i/{id}.jpg"></div>"#);
    for i in 1..=extras {
        images.push_str(&format!(
            r#"<div class="column"><img src="/i/{id}-{i}.jpg"></div>"#
        ));
    }
    let torrent = if with_torrent {
        format!(
            r#"<div class="field"><p class="control"><a href="/t/{id}.torrent">Download</a></p></div>"#
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class="card"><div class="container"><div class="columns">
            {images}
            <div class="column"><div class="card-content">
                <h5 class="title"><a href="/torrent/{id}">{id}</a><span>1 GB</span></h5>
                <p class="subtitle"><a href="/2022/03/11">2022-03-11</a></p>
                <div class="tags"><a href="/tag/x">x</a></div>
                <p class="level">{id} name</p>
                {torrent}
            </div></div>
        </div></div></div>"#
    )
}

/// A full list page of `cards`; the last pagination link carries the
/// next-page marker when `has_next` is set.
pub fn list_page_html(cards: &[String], has_next: bool) -> String {
    let last_class = if has_next { "is-inverted" } else { "is-current" };
    format!(
        r#"<!DOCTYPE html><html><body>
            {}
            <nav class="pagination"><ul class="pagination-list">
                <li><a class="pagination-link" href="/list">1</a></li>
                <li><a class="pagination-link {last_class}" href="/list?page=2">next</a></li>
            </ul></nav>
        </body></html>"#,
        cards.concat()
    )
}

/// Serves `html` as list page `page` (1-based), expecting `expected_hits`
/// requests when given.
pub async fn mount_list_page(
    server: &MockServer,
    page: u32,
    html: String,
    expected_hits: Option<u64>,
) {
    let (mock, priority) = if page == 1 {
        (
            Mock::given(method("GET")).and(path(LIST_PATH)),
            u8::MAX,
        )
    } else {
        (
            Mock::given(method("GET"))
                .and(path(LIST_PATH))
                .and(query_param("page", page.to_string())),
            1,
        )
    };
    let mock = mock
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .with_priority(priority);
    match expected_hits {
        Some(hits) => mock.expect(hits).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Serves every torrent and image path with a small body.
pub async fn mount_artifact_files(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/(t|i)/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file-bytes".to_vec()))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

/// URL of the first list page.
pub fn list_url(server: &MockServer) -> url::Url {
    url::Url::parse(&format!("{}{LIST_PATH}", server.uri())).unwrap()
}
