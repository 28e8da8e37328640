//! Fetch capability and per-episode download behavior
//!
//! [`Fetcher`] is the only seam between the archiver and the network: it turns a
//! URL plus request headers into bytes. [`EpisodeDownloader`] layers the episode
//! semantics on top (politeness delay, user agent, file placement).

use crate::config::{Config, FetcherKind};
use crate::episode::Episode;
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Extension given to every archived episode file
pub const MEDIA_EXTENSION: &str = "mp3";

/// Suffix of in-progress transfers
const PART_SUFFIX: &str = "part";

/// Per-process counter keeping concurrent temporaries apart
static PART_SEQ: AtomicU64 = AtomicU64::new(0);

/// Retrieves the bytes behind a URL
///
/// Implementations must treat any non-success response as an error; the caller
/// never sees a partial or error body as `Ok`.
///
/// # Examples
///
/// ```no_run
/// use podarchive::fetcher::{Fetcher, ReqwestFetcher};
/// use reqwest::header::HeaderMap;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = ReqwestFetcher::new(None)?;
/// let bytes = fetcher
///     .fetch("https://example.com/feed.xml", &HeaderMap::new())
///     .await?;
/// println!("{} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` with the given request headers
    async fn fetch(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> std::result::Result<Vec<u8>, FetchError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher; `timeout` bounds each whole request when set
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::transport(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, &e))?;
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

/// Build the fetcher selected in the config
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>> {
    match config.fetcher {
        FetcherKind::Reqwest => Ok(Arc::new(ReqwestFetcher::new(config.request_timeout)?)),
    }
}

/// Request headers sent with every feed and episode request
pub fn default_headers(user_agent: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(user_agent).map_err(|e| Error::Config {
        message: format!("invalid user agent: {}", e),
        key: Some("user_agent".to_string()),
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value);
    Ok(headers)
}

/// Downloads one episode into a feed's archive directory
///
/// Cheap to clone; every fetch task gets its own copy.
#[derive(Clone)]
pub struct EpisodeDownloader {
    fetcher: Arc<dyn Fetcher>,
    headers: HeaderMap,
    destination: PathBuf,
    delay: Duration,
}

impl EpisodeDownloader {
    /// Create a downloader writing into `destination`
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        headers: HeaderMap,
        destination: impl Into<PathBuf>,
        delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            headers,
            destination: destination.into(),
            delay,
        }
    }

    /// Directory episodes are written into
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Path an episode file with the given (already sanitized) stem is written to
    pub fn media_path(&self, stem: &str) -> PathBuf {
        self.destination
            .join(format!("{}.{}", stem, MEDIA_EXTENSION))
    }

    /// Fetch `episode` and write it to `<destination>/<stem>.mp3`
    ///
    /// Waits the configured delay first. Any existing file of the same name is
    /// replaced. The bytes are written to a `.part` sibling unique to this
    /// transfer and renamed into place, so the final path only ever holds a
    /// complete transfer, even when several episodes share a stem.
    pub async fn download(
        &self,
        episode: &Episode,
        stem: &str,
    ) -> std::result::Result<PathBuf, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        debug!(url = %episode.media_url, guid = %episode.guid, "Fetching episode");
        let bytes = self
            .fetcher
            .fetch(&episode.media_url, &self.headers)
            .await?;

        let final_path = self.media_path(stem);
        let part_path = self.destination.join(format!(
            "{}.{}.{}.{}",
            stem,
            MEDIA_EXTENSION,
            PART_SEQ.fetch_add(1, Ordering::Relaxed),
            PART_SUFFIX
        ));

        if let Err(source) = tokio::fs::write(&part_path, &bytes).await {
            tokio::fs::remove_file(&part_path).await.ok();
            return Err(FetchError::Write {
                path: part_path,
                source,
            });
        }
        if let Err(source) = tokio::fs::rename(&part_path, &final_path).await {
            tokio::fs::remove_file(&part_path).await.ok();
            return Err(FetchError::Write {
                path: final_path,
                source,
            });
        }

        debug!(path = %final_path.display(), bytes = bytes.len(), "Episode written");
        Ok(final_path)
    }

    /// Delete `.part` files left behind by interrupted transfers
    ///
    /// Must not run while downloads into the same directory are in flight.
    /// Returns how many were removed; files that cannot be removed are logged
    /// and left alone.
    pub async fn remove_partials(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.destination).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.destination.display(), error = %e, "Cannot scan for partial downloads");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_partial(&path) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed partial download");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Cannot remove partial download"),
            }
        }
        removed
    }
}

fn is_partial(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PART_SUFFIX)
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(&format!(".{}.", MEDIA_EXTENSION)))
}
