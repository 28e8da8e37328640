//! Feed session: one sync pass over one feed
//!
//! Loads the feed, opens its archive, works out which episodes are missing and
//! fetches them. A session owns its ledger for its whole lifetime; two sessions
//! must never target the same archive directory at once.

use crate::coordinator::{FetchOutcome, run_fetches};
use crate::delta::{SyncPlan, compute_delta};
use crate::episode::{Episode, extract_episodes};
use crate::error::{Error, Result};
use crate::feed::FeedSource;
use crate::fetcher::{EpisodeDownloader, Fetcher};
use crate::ledger::ArchiveLedger;
use crate::types::Event;
use crate::utils::sanitize;
use chrono::Utc;
use reqwest::header::HeaderMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Collaborators shared by every session of an [`Archiver`](crate::Archiver)
#[derive(Clone)]
pub struct SyncContext {
    /// Where feeds are loaded from
    pub feed_source: Arc<dyn FeedSource>,
    /// How episode bytes are fetched
    pub fetcher: Arc<dyn Fetcher>,
    /// Headers sent with every episode request
    pub headers: HeaderMap,
    /// Pause before each episode fetch
    pub fetch_delay: Duration,
    /// Event channel
    pub event_tx: broadcast::Sender<Event>,
}

/// Summary of one finished session
#[derive(Debug)]
pub struct SessionReport {
    /// Feed URL
    pub feed_url: String,
    /// Sanitized feed title
    pub title: String,
    /// Archive directory of the feed
    pub destination: PathBuf,
    /// Whether the archive was empty before this pass
    pub fresh: bool,
    /// One outcome per attempted episode, in completion order
    pub outcomes: Vec<FetchOutcome>,
}

impl SessionReport {
    /// Number of episodes downloaded and recorded
    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of episodes whose fetch failed
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.downloaded()
    }

    /// Whether there was nothing to fetch
    pub fn is_up_to_date(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// State of one feed's sync between loading the feed and finishing the downloads
#[derive(Debug)]
pub struct FeedSession {
    feed_url: String,
    title: String,
    destination: PathBuf,
    ledger: ArchiveLedger,
    plan: SyncPlan,
}

impl FeedSession {
    /// Load the feed, open its archive under `base_dir` and compute the worklist
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFeed`] if the feed is unusable, including a title with no
    ///   filesystem-safe characters
    /// - [`Error::Storage`] if the archive directory or ledger cannot be opened
    /// - any retrieval error from the feed source
    pub async fn open(feed_url: &str, base_dir: &Path, source: &dyn FeedSource) -> Result<Self> {
        let feed = source.load(feed_url).await?;

        let title = sanitize(&feed.title);
        if title.trim().is_empty() {
            return Err(Error::invalid_feed(
                feed_url,
                format!("title {:?} has no usable characters", feed.title),
            ));
        }
        let destination = base_dir.join(&title);

        let ledger = ArchiveLedger::open(&destination).await?;
        let plan = compute_delta(extract_episodes(&feed), &ledger);

        Ok(Self {
            feed_url: feed_url.to_string(),
            title,
            destination,
            ledger,
            plan,
        })
    }

    /// Sanitized feed title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Archive directory of the feed
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Episodes that will be fetched, oldest first
    pub fn pending(&self) -> &[Episode] {
        &self.plan.worklist
    }

    /// Whether the archive was empty when the session opened
    pub fn is_fresh(&self) -> bool {
        self.plan.is_fresh
    }

    /// Fetch the pending episodes with at most `concurrency_limit` in flight
    ///
    /// Individual episode failures are reported in the returned outcomes and do
    /// not fail the session.
    pub async fn download(
        mut self,
        concurrency_limit: usize,
        ctx: &SyncContext,
    ) -> Result<SessionReport> {
        ctx.event_tx
            .send(Event::SyncStarted {
                feed_url: self.feed_url.clone(),
                title: self.title.clone(),
                pending: self.plan.worklist.len(),
                fresh: self.plan.is_fresh,
            })
            .ok();

        let downloader = EpisodeDownloader::new(
            Arc::clone(&ctx.fetcher),
            ctx.headers.clone(),
            &self.destination,
            ctx.fetch_delay,
        );
        let removed = downloader.remove_partials().await;
        if removed > 0 {
            info!(feed = %self.feed_url, removed, "Removed partial downloads of {}", self.title);
        }

        if self.plan.is_empty() {
            info!(feed = %self.feed_url, "{}: no new episodes detected", self.title);
            ctx.event_tx
                .send(Event::NoNewEpisodes {
                    title: self.title.clone(),
                })
                .ok();
            return Ok(self.into_report(Vec::new()));
        }

        info!(
            feed = %self.feed_url,
            pending = self.plan.worklist.len(),
            fresh = self.plan.is_fresh,
            "Updating {}",
            self.title
        );

        let worklist = std::mem::take(&mut self.plan.worklist);

        let outcomes = run_fetches(
            worklist,
            concurrency_limit,
            &mut self.ledger,
            &ctx.event_tx,
            |episode| {
                let downloader = downloader.clone();
                let event_tx = ctx.event_tx.clone();
                async move {
                    let stem = sanitize(&episode.title);
                    info!(guid = %episode.guid, "Downloading {}", stem);
                    event_tx
                        .send(Event::EpisodeDownloading {
                            title: episode.title.clone(),
                            guid: episode.guid.clone(),
                        })
                        .ok();
                    downloader.download(&episode, &stem).await
                }
            },
        )
        .await?;

        let report = self.into_report(outcomes);
        info!(
            feed = %report.feed_url,
            downloaded = report.downloaded(),
            failed = report.failed(),
            "Finished {}",
            report.title
        );
        ctx.event_tx
            .send(Event::SyncCompleted {
                title: report.title.clone(),
                downloaded: report.downloaded(),
                failed: report.failed(),
                finished_at: Utc::now(),
            })
            .ok();
        Ok(report)
    }

    fn into_report(self, outcomes: Vec<FetchOutcome>) -> SessionReport {
        SessionReport {
            feed_url: self.feed_url,
            title: self.title,
            destination: self.destination,
            fresh: self.plan.is_fresh,
            outcomes,
        }
    }
}

/// Sync one feed into `base_dir`: open a [`FeedSession`] and run its downloads
pub async fn sync(
    feed_url: &str,
    base_dir: &Path,
    concurrency_limit: usize,
    ctx: &SyncContext,
) -> Result<SessionReport> {
    let session = FeedSession::open(feed_url, base_dir, ctx.feed_source.as_ref()).await?;
    session.download(concurrency_limit, ctx).await
}
