//! Common test utilities for podarchive integration tests

use podarchive::{Archiver, Config};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Archiver writing into `dir`, with no politeness delay
pub fn archiver_for(dir: &TempDir, concurrency: usize) -> Archiver {
    Archiver::new(Config {
        download_dir: dir.path().to_path_buf(),
        max_concurrent_downloads: concurrency,
        fetch_delay: Duration::ZERO,
        request_timeout: Some(Duration::from_secs(10)),
        ..Default::default()
    })
    .expect("failed to build archiver")
}

/// RSS document listing `episodes` newest first, media served by `server`
pub fn rss_feed(server: &MockServer, title: &str, episodes: &[usize]) -> String {
    let items: String = episodes
        .iter()
        .rev()
        .map(|n| {
            format!(
                r#"<item>
    <title>Episode {n}</title>
    <guid isPermaLink="false">ep-{n}</guid>
    <enclosure url="{uri}/media/{n}.mp3" length="7" type="audio/mpeg"/>
</item>"#,
                uri = server.uri()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>{title}</title>
<link>https://example.com</link>
<description>Test feed</description>
{items}
</channel></rss>"#
    )
}

/// Serve `body` at `route`
pub async fn mount_feed(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

/// Serve `audio-<n>` at `/media/<n>.mp3`, expecting exactly `times` requests
pub async fn mount_episode(server: &MockServer, n: usize, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/media/{}.mp3", n)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(format!("audio-{}", n).into_bytes()))
        .expect(times)
        .mount(server)
        .await;
}

/// Sorted guids recorded in `dir/archive.txt`
pub fn ledger_guids(dir: &Path) -> Vec<String> {
    let mut guids: Vec<String> = std::fs::read_to_string(dir.join("archive.txt"))
        .expect("ledger missing")
        .lines()
        .map(str::to_string)
        .collect();
    guids.sort();
    guids
}
