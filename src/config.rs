//! Configuration types for podarchive

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser-like user agent sent with every request. Some podcast CDNs refuse
/// clients that identify as a library.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_3) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/35.0.1916.47 Safari/537.36";

/// Which fetch implementation an [`Archiver`](crate::Archiver) is built with
///
/// Resolved once at construction time into a [`Fetcher`](crate::fetcher::Fetcher).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// HTTP(S) via reqwest
    #[default]
    Reqwest,
}

/// Podcast directory search settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Search endpoint (default: iTunes search API)
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Storefront country code (default: "us")
    #[serde(default = "default_country")]
    pub country: String,

    /// Maximum number of results per search (default: 20)
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            country: default_country(),
            limit: default_search_limit(),
        }
    }
}

/// Main configuration for [`Archiver`](crate::Archiver)
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base directory; each feed is archived under `<download_dir>/<sanitized title>`
    /// (default: current directory)
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent episode fetches per feed (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Pause before each individual episode fetch (default: 2000 ms)
    #[serde(
        default = "default_fetch_delay",
        with = "duration_millis_serde",
        rename = "fetch_delay_ms"
    )]
    pub fetch_delay: Duration,

    /// User agent sent with feed and episode requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fetch implementation (default: reqwest)
    #[serde(default)]
    pub fetcher: FetcherKind,

    /// Whole-request timeout in seconds (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// Directory search settings
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            fetch_delay: default_fetch_delay(),
            user_agent: default_user_agent(),
            fetcher: FetcherKind::default(),
            request_timeout: None,
            directory: DirectoryConfig::default(),
        }
    }
}

impl Config {
    /// Load a config from a JSON file
    ///
    /// Missing fields take their defaults. The result is validated before it is returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read config file {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user_agent must not be empty".to_string(),
                key: Some("user_agent".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_fetch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_search_url() -> String {
    "https://itunes.apple.com/search".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_search_limit() -> u32 {
    20
}

mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
