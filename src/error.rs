//! Error types for podarchive
//!
//! Errors are split along the containment boundary of a sync run:
//! - [`Error`] covers everything that aborts one feed's session (invalid feed,
//!   unusable storage, bad configuration)
//! - [`FetchError`] covers a single episode transfer and never escapes the
//!   fetch coordinator on its own

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for podarchive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podarchive
#[derive(Debug, Error)]
pub enum Error {
    /// The feed could not be used: unparseable, or missing the feed-level fields
    /// every well-formed feed carries
    #[error("invalid feed {url}: {reason}")]
    InvalidFeed {
        /// URL (or path) the feed was loaded from
        url: String,
        /// Human-readable reason the feed was rejected
        reason: String,
    },

    /// The archive directory or ledger file could not be created, opened or written
    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        /// Path that could not be used
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A single fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Network error outside of an episode fetch (client construction, directory search)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Storage`] for `path`
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::InvalidFeed`] for `url`
    pub fn invalid_feed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidFeed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single episode transfer
///
/// The episode's guid is never recorded when one of these is produced, so the
/// episode is picked up again on the next sync.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The transfer could not be started or did not complete
    #[error("transfer of {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport-level error description
        message: String,
    },

    /// The fetched bytes could not be written to disk
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Destination file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The task running the fetch panicked or was cancelled
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    /// Build a [`FetchError::Transport`] from a reqwest error
    pub fn transport(url: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        FetchError::Transport {
            url: url.to_string(),
            message,
        }
    }
}
