//! Podcast directory search
//!
//! Looks up podcasts by keyword in the iTunes directory and appends picked
//! feeds to a feed list file that `podarchive sync --file` can consume.

use crate::config::DirectoryConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// One podcast found in the directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryResult {
    /// Podcast name
    pub name: String,
    /// Publisher
    pub artist: String,
    /// RSS feed URL
    pub feed_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    #[serde(default)]
    collection_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    feed_url: Option<String>,
}

/// Search the directory for podcasts matching `term`
///
/// Hits without a feed URL cannot be archived and are dropped.
pub async fn search(
    client: &reqwest::Client,
    config: &DirectoryConfig,
    user_agent: &str,
    term: &str,
) -> Result<Vec<DirectoryResult>> {
    let url = format!(
        "{}?term={}&country={}&limit={}&entity=podcast",
        config.search_url,
        urlencoding::encode(term.trim()),
        urlencoding::encode(&config.country),
        config.limit
    );
    debug!(url = %url, "Searching podcast directory");

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Other(format!(
            "directory search returned HTTP {}",
            status.as_u16()
        )));
    }

    let body: SearchResponse = response.json().await?;
    Ok(body
        .results
        .into_iter()
        .filter_map(|hit| {
            Some(DirectoryResult {
                feed_url: hit.feed_url.filter(|u| !u.trim().is_empty())?,
                name: hit.collection_name.unwrap_or_default(),
                artist: hit.artist_name.unwrap_or_default(),
            })
        })
        .collect())
}

/// Append `result` to a feed list as a `#<name>` comment line followed by its URL
///
/// The file is created if missing.
pub async fn append_to_feed_list(path: &Path, result: &DirectoryResult) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| Error::storage(path, e))?;

    let name = result.name.replace(['\n', '\r'], " ");
    let entry = format!("#{}\n{}\n", name, result.feed_url.trim());
    file.write_all(entry.as_bytes())
        .await
        .map_err(|e| Error::storage(path, e))?;
    file.flush().await.map_err(|e| Error::storage(path, e))?;
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_feed_list;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn directory(server: &MockServer) -> DirectoryConfig {
        DirectoryConfig {
            search_url: format!("{}/search", server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn search_encodes_term_and_maps_results() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("term", "history of rome"))
            .and(query_param("entity", "podcast"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resultCount": 2,
                "results": [
                    {
                        "collectionName": "The History of Rome",
                        "artistName": "Mike Duncan",
                        "feedUrl": "https://feeds.example.com/rome"
                    },
                    {
                        "collectionName": "No Feed",
                        "artistName": "Someone"
                    }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let results = search(
            &reqwest::Client::new(),
            &directory(&mock_server),
            "agent",
            "history of rome",
        )
        .await
        .unwrap();

        assert_eq!(
            results,
            vec![DirectoryResult {
                name: "The History of Rome".into(),
                artist: "Mike Duncan".into(),
                feed_url: "https://feeds.example.com/rome".into(),
            }]
        );
    }

    #[tokio::test]
    async fn search_with_no_results() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"resultCount": 0, "results": []})),
            )
            .mount(&mock_server)
            .await;

        let results = search(&reqwest::Client::new(), &directory(&mock_server), "agent", "zzz")
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let result = search(&reqwest::Client::new(), &directory(&mock_server), "agent", "x").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn appended_entries_are_readable_as_feed_list() {
        let temp_dir = tempfile::tempdir().unwrap();
        let list = temp_dir.path().join("feeds.txt");

        for (name, url) in [("Show A", "https://a.example.com/rss"), ("Show B", "https://b.example.com/rss")] {
            append_to_feed_list(
                &list,
                &DirectoryResult {
                    name: name.into(),
                    artist: String::new(),
                    feed_url: url.into(),
                },
            )
            .await
            .unwrap();
        }

        let content = std::fs::read_to_string(&list).unwrap();
        assert_eq!(
            content,
            "#Show A\nhttps://a.example.com/rss\n#Show B\nhttps://b.example.com/rss\n"
        );
        assert_eq!(
            parse_feed_list(&content),
            vec!["https://a.example.com/rss", "https://b.example.com/rss"]
        );
    }
}
