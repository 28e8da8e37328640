//! # podarchive
//!
//! Incremental local archiver for podcast feeds.
//!
//! Each feed is archived into `<download_dir>/<sanitized feed title>/`: one
//! `.mp3` per episode plus an append-only `archive.txt` listing the guid of
//! every episode that has been completely written. A sync loads the feed,
//! compares its episodes with that ledger and fetches only what is missing, with
//! a bounded number of fetches in flight. Every completed episode is recorded
//! durably before the next completion is handled, so an interrupted sync picks
//! up exactly where it stopped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use podarchive::{Archiver, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         download_dir: "./podcasts".into(),
//!         max_concurrent_downloads: 3,
//!         ..Default::default()
//!     };
//!
//!     let archiver = Archiver::new(config)?;
//!     let report = archiver
//!         .sync_all(["https://example.com/feed.xml", "https://example.org/rss"])
//!         .await;
//!
//!     println!("{} episodes downloaded", report.downloaded());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch driver
pub mod archiver;
/// Configuration types
pub mod config;
/// Fetch coordinator
pub mod coordinator;
/// Delta calculation
pub mod delta;
/// Podcast directory search
pub mod directory;
/// Episode extraction
pub mod episode;
/// Error types
pub mod error;
/// Feed retrieval and parsing
pub mod feed;
/// Fetch capability
pub mod fetcher;
/// Archive ledger
pub mod ledger;
/// Feed session
pub mod session;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use archiver::{Archiver, BatchReport};
pub use config::{Config, DirectoryConfig, FetcherKind};
pub use coordinator::{FetchOutcome, run_fetches};
pub use delta::{SyncPlan, compute_delta};
pub use episode::{Episode, extract_episodes};
pub use error::{Error, FetchError, Result};
pub use feed::{Enclosure, FeedEntry, FeedSource, HttpFeedSource, ParsedFeed};
pub use fetcher::{EpisodeDownloader, Fetcher, ReqwestFetcher};
pub use ledger::ArchiveLedger;
pub use session::{FeedSession, SessionReport, SyncContext, sync};
pub use types::Event;
pub use utils::sanitize;
