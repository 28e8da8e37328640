//! Episode extraction
//!
//! Turns a [`ParsedFeed`]'s entries into the list of downloadable episodes,
//! oldest first.

use crate::feed::ParsedFeed;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A downloadable audio attachment of one feed entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// 1-based position of the entry in the feed, oldest entry = 1
    pub ordinal: usize,
    /// Display title, `"<ordinal> - <entry title>"`
    pub title: String,
    /// Media URL
    pub media_url: String,
    /// Entry guid; the archive's dedup key
    pub guid: String,
}

/// Extract the episodes of a feed in chronological order
///
/// Entries are numbered oldest first. Every audio enclosure of an entry yields
/// one episode, so an entry with several audio enclosures produces several
/// episodes sharing a guid and title. Entries without an audio enclosure (or
/// without any identifier) still take up an ordinal but produce nothing.
pub fn extract_episodes(feed: &ParsedFeed) -> Vec<Episode> {
    let mut episodes = Vec::new();

    for (index, entry) in feed.entries.iter().rev().enumerate() {
        let ordinal = index + 1;

        let Some(guid) = entry.guid.as_deref() else {
            debug!(ordinal, "Skipping entry without identifier");
            continue;
        };
        let entry_title = entry.title.as_deref().unwrap_or("");

        for enclosure in entry.enclosures.iter().filter(|e| e.is_audio()) {
            episodes.push(Episode {
                ordinal,
                title: format!("{} - {}", ordinal, entry_title),
                media_url: enclosure.url.clone(),
                guid: guid.to_string(),
            });
        }
    }

    episodes
}
