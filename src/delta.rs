//! Delta calculation: which extracted episodes still need downloading

use crate::episode::Episode;
use crate::ledger::ArchiveLedger;

/// Worklist for one sync pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncPlan {
    /// Episodes to fetch, oldest first
    pub worklist: Vec<Episode>,
    /// Whether the archive was empty, so the whole feed is being fetched
    pub is_fresh: bool,
}

impl SyncPlan {
    /// Whether there is nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.worklist.is_empty()
    }
}

/// Compare `episodes` against `ledger`
///
/// An empty ledger means a brand-new archive: every episode in the feed is
/// selected. Otherwise only episodes whose guid is not recorded are kept, in
/// their original order.
pub fn compute_delta(episodes: Vec<Episode>, ledger: &ArchiveLedger) -> SyncPlan {
    if ledger.is_empty() {
        return SyncPlan {
            worklist: episodes,
            is_fresh: true,
        };
    }

    let worklist = episodes
        .into_iter()
        .filter(|episode| !ledger.contains(&episode.guid))
        .collect();

    SyncPlan {
        worklist,
        is_fresh: false,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn episodes(n: usize) -> Vec<Episode> {
        (1..=n)
            .map(|i| Episode {
                ordinal: i,
                title: format!("{} - Episode", i),
                media_url: format!("https://cdn.example.com/{}.mp3", i),
                guid: format!("g{}", i),
            })
            .collect()
    }

    async fn ledger_with(dir: &TempDir, guids: &[&str]) -> ArchiveLedger {
        let content: String = guids.iter().map(|g| format!("{}\n", g)).collect();
        std::fs::write(dir.path().join("archive.txt"), content).unwrap();
        ArchiveLedger::open(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn empty_ledger_selects_everything() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &[]).await;

        let plan = compute_delta(episodes(4), &ledger);

        assert!(plan.is_fresh);
        assert_eq!(plan.worklist, episodes(4));
    }

    #[tokio::test]
    async fn selects_unrecorded_in_order() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &["g1", "g3", "g4"]).await;

        let plan = compute_delta(episodes(5), &ledger);

        assert!(!plan.is_fresh);
        let guids: Vec<&str> = plan.worklist.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["g2", "g5"]);
    }

    #[tokio::test]
    async fn fully_recorded_feed_is_empty_plan() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &["g1", "g2"]).await;

        let plan = compute_delta(episodes(2), &ledger);

        assert!(plan.is_empty());
        assert!(!plan.is_fresh);
    }

    #[tokio::test]
    async fn unknown_ledger_entries_do_not_matter() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &["removed-from-feed"]).await;

        let plan = compute_delta(episodes(2), &ledger);

        assert!(!plan.is_fresh);
        assert_eq!(plan.worklist.len(), 2);
    }
}
