//! Feed retrieval and parsing
//!
//! Loads an RSS 2.0 or Atom document and flattens it into a [`ParsedFeed`]: the
//! feed title plus the entries in published order, each with its media
//! enclosures. Feeds are read over HTTP through a [`Fetcher`], or from disk for
//! `file://` URLs and plain paths.

use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use reqwest::header::HeaderMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Media attachment of a feed entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enclosure {
    /// Media URL
    pub url: String,
    /// Declared MIME type (empty when the feed omits it)
    pub mime_type: String,
}

impl Enclosure {
    /// Whether the MIME type marks this enclosure as audio
    pub fn is_audio(&self) -> bool {
        self.mime_type.contains("audio")
    }
}

/// One entry of a feed, as published
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Stable identifier (guid for RSS, id for Atom)
    pub guid: Option<String>,
    /// Entry title
    pub title: Option<String>,
    /// Publication date
    pub published: Option<DateTime<Utc>>,
    /// Attached media, in document order
    pub enclosures: Vec<Enclosure>,
}

/// A parsed feed document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Feed title, never empty
    pub title: String,
    /// Feed home page, if any
    pub link: Option<String>,
    /// Entries in document order (newest first by convention)
    pub entries: Vec<FeedEntry>,
}

/// Source of parsed feeds
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Load and parse the feed at `url`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFeed`] if the document is not a usable feed
    /// - [`Error::Fetch`] or [`Error::Io`] if it could not be retrieved
    async fn load(&self, url: &str) -> Result<ParsedFeed>;
}

/// [`FeedSource`] that fetches over HTTP, or reads local files
pub struct HttpFeedSource {
    fetcher: Arc<dyn Fetcher>,
    headers: HeaderMap,
}

impl HttpFeedSource {
    /// Create a feed source fetching through `fetcher` with `headers`
    pub fn new(fetcher: Arc<dyn Fetcher>, headers: HeaderMap) -> Self {
        Self { fetcher, headers }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn load(&self, url: &str) -> Result<ParsedFeed> {
        debug!(feed = %url, "Loading feed");
        let content = match local_path(url) {
            Some(path) => tokio::fs::read(&path).await?,
            None => self.fetcher.fetch(url, &self.headers).await?,
        };
        parse_feed(url, &content)
    }
}

/// Resolve `file://` URLs and scheme-less strings to a path
fn local_path(url: &str) -> Option<PathBuf> {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "file" => parsed.to_file_path().ok(),
        Ok(_) => None,
        Err(_) => Some(PathBuf::from(url)),
    }
}

/// Parse feed bytes, trying RSS first and falling back to Atom
///
/// `url` is only used for error messages.
pub fn parse_feed(url: &str, content: &[u8]) -> Result<ParsedFeed> {
    let feed = match parse_as_rss(content) {
        Ok(feed) => {
            debug!(entries = feed.entries.len(), "Parsed as RSS");
            feed
        }
        Err(rss_err) => {
            debug!("Failed to parse as RSS: {}, trying Atom", rss_err);
            match parse_as_atom(content) {
                Ok(feed) => {
                    debug!(entries = feed.entries.len(), "Parsed as Atom");
                    feed
                }
                Err(atom_err) => {
                    return Err(Error::invalid_feed(
                        url,
                        format!(
                            "not RSS or Atom. RSS error: {}. Atom error: {}",
                            rss_err, atom_err
                        ),
                    ));
                }
            }
        }
    };

    if feed.title.trim().is_empty() {
        return Err(Error::invalid_feed(url, "feed has no title"));
    }
    Ok(feed)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_as_rss(content: &[u8]) -> std::result::Result<ParsedFeed, rss::Error> {
    let channel = rss::Channel::read_from(content)?;

    // rss::Item keeps a single <enclosure>, so take them from the raw scan
    let mut scanned = match scan_rss_enclosures(content) {
        Ok(scanned) if scanned.len() == channel.items().len() => scanned,
        Ok(scanned) => {
            debug!(
                scanned = scanned.len(),
                items = channel.items().len(),
                "Enclosure scan disagrees with parsed items, using parsed enclosures"
            );
            Vec::new()
        }
        Err(e) => {
            debug!("Enclosure scan failed: {}, using parsed enclosures", e);
            Vec::new()
        }
    }
    .into_iter();

    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let enclosures: Vec<Enclosure> = match scanned.next() {
                Some(all) => all,
                None => item
                    .enclosure()
                    .map(|enc| Enclosure {
                        url: enc.url().to_string(),
                        mime_type: enc.mime_type().to_string(),
                    })
                    .into_iter()
                    .collect(),
            };

            // Prefer guid, fall back to link, then media URL, then title
            let guid = item
                .guid()
                .and_then(|g| non_empty(g.value()))
                .or_else(|| item.link().and_then(non_empty))
                .or_else(|| enclosures.first().and_then(|e| non_empty(&e.url)))
                .or_else(|| item.title().and_then(non_empty));

            let published = item.pub_date().and_then(|date| {
                DateTime::parse_from_rfc2822(date)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });

            FeedEntry {
                guid,
                title: item.title().map(str::to_string),
                published,
                enclosures,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: channel.title().trim().to_string(),
        link: non_empty(channel.link()),
        entries,
    })
}

/// Collect the `<enclosure>` elements of every `<item>`, one list per item in
/// document order
fn scan_rss_enclosures(
    content: &[u8],
) -> std::result::Result<Vec<Vec<Enclosure>>, quick_xml::Error> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();
    let mut items: Vec<Vec<Enclosure>> = Vec::new();
    let mut in_item = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) if e.name().as_ref() == b"item" => {
                items.push(Vec::new());
                in_item = true;
            }
            XmlEvent::Empty(e) if e.name().as_ref() == b"item" => items.push(Vec::new()),
            XmlEvent::End(e) if e.name().as_ref() == b"item" => in_item = false,
            XmlEvent::Start(e) | XmlEvent::Empty(e)
                if in_item && e.name().as_ref() == b"enclosure" =>
            {
                let mut enclosure = Enclosure {
                    url: String::new(),
                    mime_type: String::new(),
                };
                for attr in e.attributes().flatten() {
                    let Ok(value) = attr.unescape_value() else {
                        continue;
                    };
                    match attr.key.as_ref() {
                        b"url" => enclosure.url = value.trim().to_string(),
                        b"type" => enclosure.mime_type = value.trim().to_string(),
                        _ => {}
                    }
                }
                match items.last_mut() {
                    Some(current) if !enclosure.url.is_empty() => current.push(enclosure),
                    _ => {}
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn parse_as_atom(content: &[u8]) -> std::result::Result<ParsedFeed, atom_syndication::Error> {
    let feed = atom_syndication::Feed::read_from(content)?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            let enclosures: Vec<Enclosure> = entry
                .links()
                .iter()
                .filter(|link| link.rel() == "enclosure")
                .map(|link| Enclosure {
                    url: link.href().to_string(),
                    mime_type: link.mime_type().unwrap_or("").to_string(),
                })
                .collect();

            let guid = non_empty(entry.id()).or_else(|| {
                entry
                    .links()
                    .first()
                    .and_then(|link| non_empty(link.href()))
            });

            let published = entry
                .published()
                .copied()
                .unwrap_or_else(|| *entry.updated())
                .with_timezone(&Utc);

            FeedEntry {
                guid,
                title: Some(entry.title().as_str().to_string()),
                published: Some(published),
                enclosures,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title().as_str().trim().to_string(),
        link: feed
            .links()
            .iter()
            .find(|link| link.rel() == "alternate")
            .map(|link| link.href().to_string()),
        entries,
    })
}
