//! Core types and events for podarchive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event emitted while syncing feeds
///
/// Every outcome of a sync has its own variant, so a subscriber can render a
/// distinct status line for each one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A feed was loaded and its archive opened
    SyncStarted {
        /// Feed URL
        feed_url: String,
        /// Sanitized feed title (also the archive directory name)
        title: String,
        /// Number of episodes selected for download
        pending: usize,
        /// Whether the archive was empty before this sync
        fresh: bool,
    },

    /// The feed has nothing that is not already archived
    NoNewEpisodes {
        /// Sanitized feed title
        title: String,
    },

    /// An episode fetch is starting
    EpisodeDownloading {
        /// Episode title
        title: String,
        /// Episode guid
        guid: String,
    },

    /// An episode was written to disk and recorded in the archive
    EpisodeDownloaded {
        /// Episode title
        title: String,
        /// Episode guid
        guid: String,
        /// Final path of the media file
        path: PathBuf,
    },

    /// An episode fetch failed; it stays eligible for the next sync
    EpisodeFailed {
        /// Episode title
        title: String,
        /// Episode guid
        guid: String,
        /// Error message
        error: String,
    },

    /// A feed's download pass finished
    SyncCompleted {
        /// Sanitized feed title
        title: String,
        /// Episodes downloaded and recorded
        downloaded: usize,
        /// Episodes that failed
        failed: usize,
        /// Completion time
        finished_at: DateTime<Utc>,
    },

    /// A feed's session was aborted (invalid feed, unusable storage)
    SyncFailed {
        /// Feed URL
        feed_url: String,
        /// Error message
        error: String,
    },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::SyncStarted {
                title,
                pending,
                fresh,
                ..
            } => {
                if *fresh {
                    write!(f, "Updating {title}: new archive, {pending} episode(s) to fetch")
                } else {
                    write!(f, "Updating {title}: {pending} new episode(s)")
                }
            }
            Event::NoNewEpisodes { title } => write!(f, "{title}: no new episodes detected"),
            Event::EpisodeDownloading { title, .. } => write!(f, "Downloading {title}"),
            Event::EpisodeDownloaded { title, .. } => write!(f, "Downloaded {title}"),
            Event::EpisodeFailed { title, error, .. } => {
                write!(f, "Failed to download {title}: {error}")
            }
            Event::SyncCompleted {
                title,
                downloaded,
                failed,
                ..
            } => write!(
                f,
                "{title}: {downloaded} downloaded, {failed} failed"
            ),
            Event::SyncFailed { feed_url, error } => {
                write!(f, "Skipping {feed_url}: {error}")
            }
        }
    }
}
