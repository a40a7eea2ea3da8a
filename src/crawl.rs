//! One crawl cycle end to end, and the loop that repeats it.
//!
//! A cycle fans out over every feed source, keeps only links the store has
//! never seen, records them, then writes the per-cycle snapshot and the
//! failure log section.

use crate::config::Config;
use crate::extract::CandidateLink;
use crate::feed::{effective_workers, fetch_feed, run_all, FeedClient, RetryPolicy};
use crate::storage::{append_failure_log, write_snapshot, LinkStore, StoreError};
use chrono::{DateTime, Local};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Shortest pause between cycles in continuous mode.
const MIN_CYCLE_INTERVAL: Duration = Duration::from_secs(1);

/// Where the crawler is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    /// Feeds are being fetched
    Running,
    /// New links are being written to the store and artifacts
    Saving,
}

/// Summary of one finished cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    /// Feed sources attempted this cycle.
    pub feeds: usize,
    /// Distinct links found across all feeds, new or not.
    pub found: usize,
    /// Links never seen before this cycle, sorted.
    pub new_links: Vec<CandidateLink>,
    /// Sources that exhausted their attempts, sorted.
    pub failed_sources: Vec<String>,
    /// Snapshot file written this cycle, if any.
    pub snapshot: Option<PathBuf>,
    /// Store and artifact write failures.
    pub errors: Vec<String>,
}

impl CycleReport {
    pub fn new_count(&self) -> usize {
        self.new_links.len()
    }

    /// True when every write succeeded. Failed feeds do not count.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Drives crawl cycles over a fixed set of feed sources.
pub struct Crawler<C> {
    client: C,
    policy: RetryPolicy,
    sources: Vec<String>,
    /// Config entries that failed URL validation, reported with the first
    /// cycle's failures.
    rejected: Vec<String>,
    workers: usize,
    interval: Duration,
    snapshot_dir: PathBuf,
    failed_log: PathBuf,
    store: LinkStore,
    state: CrawlState,
}

impl<C: FeedClient> Crawler<C> {
    /// Builds a crawler from `config`, loading the link store from disk.
    ///
    /// # Errors
    ///
    /// Fails only when an existing store file cannot be read.
    pub fn new(config: &Config, client: C, policy: RetryPolicy) -> Result<Self, StoreError> {
        let store = LinkStore::open(&config.output_file)?;
        let (sources, rejected) = config.split_feed_sources();
        let workers = effective_workers(config.concurrent_requests);

        if config.concurrent_requests > workers {
            tracing::info!(
                requested = config.concurrent_requests,
                workers,
                "Concurrency capped"
            );
        }

        let interval = config.interval_duration();
        if interval < MIN_CYCLE_INTERVAL {
            tracing::warn!(
                configured_secs = config.interval,
                "Interval below one second, using one second"
            );
        }

        Ok(Self {
            client,
            policy,
            sources,
            rejected,
            workers,
            interval: interval.max(MIN_CYCLE_INTERVAL),
            snapshot_dir: config.snapshot_dir.clone(),
            failed_log: config.failed_log.clone(),
            store,
            state: CrawlState::Idle,
        })
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn store(&self) -> &LinkStore {
        &self.store
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Runs one full cycle. Never fails: per-feed errors end up in
    /// `failed_sources` and write errors in `errors`.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started_at = Local::now();
        self.state = CrawlState::Running;
        tracing::info!(feeds = self.sources.len(), workers = self.workers, "Crawl cycle started");

        let client = &self.client;
        let policy = &self.policy;
        let cycle = run_all(&self.sources, self.workers, |source| {
            fetch_feed(client, source, policy)
        })
        .await;

        self.state = CrawlState::Saving;

        let found = cycle.links.len();
        let mut new_links: Vec<CandidateLink> = cycle
            .links
            .into_iter()
            .filter(|link| self.store.is_new(link.as_str()))
            .collect();
        new_links.sort();
        let mut failed = cycle.failed;
        failed.extend(std::mem::take(&mut self.rejected));
        let failed_sources: Vec<String> = failed.into_iter().collect();

        let mut errors = Vec::new();
        let saved_at = Local::now();
        let snapshot = self.save_links(&new_links, &saved_at, &mut errors);

        if !failed_sources.is_empty() {
            if let Err(e) = append_failure_log(&self.failed_log, &saved_at, &failed_sources) {
                tracing::error!(error = %e, "Failed to append failure log");
                errors.push(e.to_string());
            }
        }

        self.state = CrawlState::Idle;

        let report = CycleReport {
            started_at,
            feeds: self.sources.len(),
            found,
            new_links,
            failed_sources,
            snapshot,
            errors,
        };
        tracing::info!(
            found = report.found,
            new = report.new_count(),
            failed = report.failed_sources.len(),
            succeeded = cycle.succeeded,
            total_known = self.store.len(),
            "Crawl cycle finished"
        );
        report
    }

    /// Records new links and writes the snapshot. The snapshot is skipped
    /// when the store append fails.
    fn save_links(
        &mut self,
        new_links: &[CandidateLink],
        at: &DateTime<Local>,
        errors: &mut Vec<String>,
    ) -> Option<PathBuf> {
        if new_links.is_empty() {
            return None;
        }

        if let Err(e) = self.store.record_all(new_links) {
            tracing::error!(error = %e, "Failed to record new links");
            errors.push(e.to_string());
            return None;
        }

        match write_snapshot(&self.snapshot_dir, at, new_links) {
            Ok(path) => {
                tracing::info!(path = %path.display(), links = new_links.len(), "Snapshot written");
                Some(path)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to write snapshot");
                errors.push(e.to_string());
                None
            }
        }
    }

    /// Repeats [`run_cycle`](Self::run_cycle) until `shutdown` resolves.
    ///
    /// `shutdown` is only polled while sleeping between cycles, so a cycle
    /// in progress always runs to completion. Returns the number of cycles
    /// run.
    pub async fn run_continuous<S>(&mut self, shutdown: S) -> usize
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0usize;

        loop {
            let report = self.run_cycle().await;
            cycles += 1;
            tracing::info!(
                cycle = cycles,
                new = report.new_count(),
                next_in_secs = self.interval.as_secs(),
                "Waiting for next cycle"
            );

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(cycles, "Shutdown requested, stopping");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        cycles
    }
}
