//! Fetch coordinator
//!
//! Runs a worklist of episode fetches as spawned tasks, at most
//! `concurrency_limit` of them past the limiter at any time, and consumes their
//! results in completion order. The consumer is the only place the ledger is
//! written: each success is appended and synced before the next completion is
//! looked at, so after N completed fetches exactly N guids are on disk.

use crate::episode::Episode;
use crate::error::{FetchError, Result};
use crate::ledger::ArchiveLedger;
use crate::types::Event;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Result of one episode fetch
#[derive(Debug)]
pub struct FetchOutcome {
    /// The episode that was fetched
    pub episode: Episode,
    /// Path of the written file, or why the fetch failed
    pub result: std::result::Result<PathBuf, FetchError>,
}

impl FetchOutcome {
    /// Whether the episode was written and recorded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch every episode in `worklist` and record successes in `ledger`
///
/// `fetch_fn` builds the fetch future for one episode; it is spawned onto the
/// runtime and only starts once it holds one of `concurrency_limit` permits
/// (a limit of 0 is treated as 1). Failed fetches are reported in the returned
/// outcomes and never recorded, so they are retried on the next sync; they do not
/// affect the other fetches.
///
/// Outcomes are returned in completion order.
///
/// # Errors
///
/// Only a ledger write failure ends the run early. The remaining fetch tasks are
/// aborted and the storage error is returned.
pub async fn run_fetches<F, Fut>(
    worklist: Vec<Episode>,
    concurrency_limit: usize,
    ledger: &mut ArchiveLedger,
    event_tx: &broadcast::Sender<Event>,
    fetch_fn: F,
) -> Result<Vec<FetchOutcome>>
where
    F: Fn(Episode) -> Fut,
    Fut: Future<Output = std::result::Result<PathBuf, FetchError>> + Send + 'static,
{
    let limiter = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let total = worklist.len();
    let mut tasks = JoinSet::new();
    // Episodes by task, so a task that dies still gets an outcome
    let mut in_flight = HashMap::with_capacity(total);

    for episode in worklist {
        let fetch = fetch_fn(episode.clone());
        let limiter = Arc::clone(&limiter);
        let handle = tasks.spawn(async move {
            match limiter.acquire_owned().await {
                Ok(_permit) => AssertUnwindSafe(fetch)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(FetchError::TaskFailed(panic_message(&*panic)))),
                Err(_) => Err(FetchError::TaskFailed(
                    "concurrency limiter closed".to_string(),
                )),
            }
        });
        in_flight.insert(handle.id(), episode);
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!(error = %e, "Fetch task did not complete");
                (e.id(), Err(FetchError::TaskFailed(e.to_string())))
            }
        };
        let Some(episode) = in_flight.remove(&id) else {
            error!(task = %id, "Completed fetch task has no episode");
            continue;
        };

        match &result {
            Ok(path) => {
                // Dropping `tasks` on error aborts whatever is still running
                ledger.record(&episode.guid).await?;
                info!(guid = %episode.guid, path = %path.display(), "Downloaded {}", episode.title);
                event_tx
                    .send(Event::EpisodeDownloaded {
                        title: episode.title.clone(),
                        guid: episode.guid.clone(),
                        path: path.clone(),
                    })
                    .ok();
            }
            Err(e) => {
                warn!(guid = %episode.guid, error = %e, "Failed to download {}", episode.title);
                event_tx
                    .send(Event::EpisodeFailed {
                        title: episode.title.clone(),
                        guid: episode.guid.clone(),
                        error: e.to_string(),
                    })
                    .ok();
            }
        }

        outcomes.push(FetchOutcome { episode, result });
    }

    Ok(outcomes)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "fetch task panicked".to_string()
    }
}
