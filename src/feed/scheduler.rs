use crate::extract::CandidateLink;
use crate::feed::retry::FeedOutcome;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Upper bound on simultaneous fetches, whatever the configuration says.
/// Most share-link hosts throttle hard and drop connections above this.
pub const HARD_CAP: usize = 3;

/// Worker count actually used for a configured concurrency.
pub fn effective_workers(configured: usize) -> usize {
    configured.clamp(1, HARD_CAP)
}

/// Links and failures gathered over one pass across every feed source.
#[derive(Debug, Default)]
pub struct CrawlCycleResult {
    /// Links found this cycle, before the store decides which are new.
    pub links: HashSet<CandidateLink>,
    /// Sources that exhausted their attempt budget (or whose task died).
    pub failed: BTreeSet<String>,
    pub succeeded: usize,
}

impl CrawlCycleResult {
    pub fn merge(&mut self, outcome: FeedOutcome) {
        if outcome.success {
            self.failed.remove(&outcome.source);
            self.links.extend(outcome.links);
            self.succeeded += 1;
        } else {
            self.failed.insert(outcome.source);
        }
    }
}

/// Runs `fetch` for every source with at most [`effective_workers`] in
/// flight, folding outcomes in completion order.
///
/// A task that panics is reported as a failure for its own source only; the
/// remaining tasks keep running.
pub async fn run_all<F, Fut>(sources: &[String], max_workers: usize, fetch: F) -> CrawlCycleResult
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = FeedOutcome>,
{
    let workers = effective_workers(max_workers);
    let fetch = &fetch;

    tracing::debug!(sources = sources.len(), workers, "Dispatching feed fetches");

    stream::iter(sources.iter().cloned())
        .map(|source| async move {
            let owned = source.clone();
            let task = AssertUnwindSafe(async move { fetch(owned).await });
            match task.catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    tracing::error!(
                        feed = %source,
                        panic = %panic_message(panic.as_ref()),
                        "Feed task panicked, recording as failed"
                    );
                    FeedOutcome::failed(source, 0)
                }
            }
        })
        .buffer_unordered(workers)
        .fold(CrawlCycleResult::default(), |mut cycle, outcome| async move {
            cycle.merge(outcome);
            cycle
        })
        .await
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
