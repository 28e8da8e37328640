//! Batch driver: owns configuration, collaborators and the event channel, and
//! syncs feeds one after another

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{FeedSource, HttpFeedSource};
use crate::fetcher::{Fetcher, build_fetcher, default_headers};
use crate::session::{SessionReport, SyncContext, sync};
use crate::types::Event;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Outcome of syncing a list of feeds
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Sessions that ran to completion (individual episodes may still have failed)
    pub completed: Vec<SessionReport>,
    /// Feeds whose session was aborted, with the reason
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    /// Total episodes downloaded across all feeds
    pub fn downloaded(&self) -> usize {
        self.completed.iter().map(SessionReport::downloaded).sum()
    }

    /// Total episode failures across completed feeds
    pub fn failed_episodes(&self) -> usize {
        self.completed.iter().map(SessionReport::failed).sum()
    }
}

/// Archives podcast feeds into a local directory tree
///
/// # Examples
///
/// ```no_run
/// use podarchive::{Archiver, Config};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archiver = Archiver::new(Config {
///     download_dir: "/srv/podcasts".into(),
///     ..Default::default()
/// })?;
///
/// let mut events = archiver.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{}", event);
///     }
/// });
///
/// let report = archiver.sync_feed("https://example.com/feed.xml").await?;
/// println!("{} new episodes", report.downloaded());
/// # Ok(())
/// # }
/// ```
pub struct Archiver {
    config: Config,
    ctx: SyncContext,
}

impl Archiver {
    /// Create an archiver using the fetcher selected in `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config is invalid, or an error if the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = build_fetcher(&config)?;
        let headers = default_headers(&config.user_agent)?;
        let feed_source = Arc::new(HttpFeedSource::new(Arc::clone(&fetcher), headers.clone()));
        Ok(Self::assemble(config, feed_source, fetcher, headers))
    }

    /// Create an archiver with explicit feed source and fetcher
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config is invalid.
    pub fn with_parts(
        config: Config,
        feed_source: Arc<dyn FeedSource>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let headers = default_headers(&config.user_agent)?;
        Ok(Self::assemble(config, feed_source, fetcher, headers))
    }

    fn assemble(
        config: Config,
        feed_source: Arc<dyn FeedSource>,
        fetcher: Arc<dyn Fetcher>,
        headers: HeaderMap,
    ) -> Self {
        // Multiple subscribers each receive every event
        let (event_tx, _rx) = broadcast::channel(1000);

        info!(
            fetcher = fetcher.name(),
            download_dir = %config.download_dir.display(),
            concurrency = config.max_concurrent_downloads,
            "Archiver ready"
        );

        let ctx = SyncContext {
            feed_source,
            fetcher,
            headers,
            fetch_delay: config.fetch_delay,
            event_tx,
        };
        Self { config, ctx }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to sync events
    ///
    /// Events are buffered, but a subscriber that falls more than 1000 events
    /// behind misses the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.ctx.event_tx.subscribe()
    }

    /// Sync a single feed
    ///
    /// # Errors
    ///
    /// Returns the session-level error (invalid feed, unusable storage, feed not
    /// retrievable). Individual episode failures are in the report instead.
    pub async fn sync_feed(&self, feed_url: &str) -> Result<SessionReport> {
        let result = sync(
            feed_url,
            &self.config.download_dir,
            self.config.max_concurrent_downloads,
            &self.ctx,
        )
        .await;

        if let Err(e) = &result {
            error!(feed = %feed_url, error = %e, "Sync failed");
            self.ctx
                .event_tx
                .send(Event::SyncFailed {
                    feed_url: feed_url.to_string(),
                    error: e.to_string(),
                })
                .ok();
        }
        result
    }

    /// Sync feeds one after another
    ///
    /// A feed whose session fails is logged and skipped; the remaining feeds are
    /// still processed.
    pub async fn sync_all<I, S>(&self, feed_urls: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for url in feed_urls {
            let url = url.as_ref();
            match self.sync_feed(url).await {
                Ok(session) => report.completed.push(session),
                Err(e) => report.failed.push((url.to_string(), e)),
            }
        }
        info!(
            feeds = report.completed.len() + report.failed.len(),
            failed_feeds = report.failed.len(),
            downloaded = report.downloaded(),
            "Batch finished"
        );
        report
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_config() {
        let config = Config {
            max_concurrent_downloads: 0,
            ..Default::default()
        };
        assert!(matches!(Archiver::new(config), Err(Error::Config { .. })));
    }

    #[test]
    fn new_rejects_unsendable_user_agent() {
        let config = Config {
            user_agent: "agent\nsmuggled".to_string(),
            ..Default::default()
        };
        match Archiver::new(config) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("user_agent")),
            Err(other) => panic!("expected Config error, got {other:?}"),
            Ok(_) => panic!("expected Config error"),
        }
    }

    #[test]
    fn new_sends_configured_user_agent() {
        let archiver = Archiver::new(Config {
            user_agent: "podarchive-test/1.0".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            archiver.ctx.headers.get(reqwest::header::USER_AGENT).unwrap(),
            "podarchive-test/1.0"
        );
        assert_eq!(archiver.ctx.fetch_delay, archiver.config().fetch_delay);
    }

    #[tokio::test]
    async fn unreachable_feed_is_reported_and_returned() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(Config {
            download_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let mut events = archiver.subscribe();

        let missing = temp_dir.path().join("missing.xml");
        let result = archiver.sync_feed(missing.to_str().unwrap()).await;

        assert!(result.is_err());
        match events.try_recv().unwrap() {
            Event::SyncFailed { feed_url, .. } => {
                assert_eq!(feed_url, missing.to_str().unwrap())
            }
            other => panic!("expected SyncFailed, got {other:?}"),
        }
    }
}
