use crate::extract::{extract, CandidateLink};
use crate::feed::fetcher::{FeedClient, FetchError};
use std::collections::HashSet;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_JITTER_MIN: Duration = Duration::from_secs(1);
const DEFAULT_JITTER_MAX: Duration = Duration::from_secs(3);
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);
const DEFAULT_REMOTE_CLOSED_COOLDOWN: Duration = Duration::from_secs(5);

/// How hard one feed is tried within a cycle.
///
/// Per attempt: sleep a random delay in `jitter_min..=jitter_max`, then
/// fetch. After failed attempt `n` (1-indexed) sleep `base_backoff * n`,
/// plus `remote_closed_cooldown` when the host dropped the connection.
/// Nothing is slept after the last attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub base_backoff: Duration,
    pub remote_closed_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            jitter_min: DEFAULT_JITTER_MIN,
            jitter_max: DEFAULT_JITTER_MAX,
            base_backoff: DEFAULT_BASE_BACKOFF,
            remote_closed_cooldown: DEFAULT_REMOTE_CLOSED_COOLDOWN,
        }
    }
}

impl RetryPolicy {
    /// A policy with every delay set to zero.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            base_backoff: Duration::ZERO,
            remote_closed_cooldown: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Random pre-request pause so workers don't hit a host in lockstep.
    pub fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::random_range(min..=max))
    }

    /// Pause after failed attempt `attempt`, or `None` once the budget is
    /// spent.
    pub fn delay_after_failure(&self, attempt: u32, error: &FetchError) -> Option<Duration> {
        if attempt >= self.attempts() {
            return None;
        }
        let backoff = self.base_backoff.saturating_mul(attempt);
        let cooldown = if error.is_remote_closed() {
            self.remote_closed_cooldown
        } else {
            Duration::ZERO
        };
        Some(backoff.saturating_add(cooldown))
    }
}

/// Result of crawling one feed source for one cycle.
#[derive(Debug)]
pub struct FeedOutcome {
    pub source: String,
    /// Every link extracted from the feed; empty on failure.
    pub links: HashSet<CandidateLink>,
    pub success: bool,
    /// Attempts made (0 when the task never ran to completion).
    pub attempts: u32,
}

impl FeedOutcome {
    pub fn failed(source: String, attempts: u32) -> Self {
        Self {
            source,
            links: HashSet::new(),
            success: false,
            attempts,
        }
    }
}

/// Fetches one feed with bounded retries and extracts its links.
///
/// Every error is absorbed here: the worst case is an outcome with
/// `success == false`. A feed with no matching links is still a success.
pub async fn fetch_feed<C: FeedClient>(
    client: &C,
    source: String,
    policy: &RetryPolicy,
) -> FeedOutcome {
    let max_attempts = policy.attempts();

    for attempt in 1..=max_attempts {
        tokio::time::sleep(policy.jitter()).await;
        tracing::debug!(feed = %source, attempt, max_attempts, "Fetching feed");

        match client.fetch_entries(&source).await {
            Ok(entries) => {
                let mut links = HashSet::new();
                for entry in &entries {
                    links.extend(extract(&entry.combined_text()));
                }
                tracing::info!(
                    feed = %source,
                    entries = entries.len(),
                    links = links.len(),
                    attempt,
                    "Feed crawled"
                );
                return FeedOutcome {
                    source,
                    links,
                    success: true,
                    attempts: attempt,
                };
            }
            Err(e) => {
                let delay = policy.delay_after_failure(attempt, &e);
                tracing::warn!(
                    feed = %source,
                    attempt,
                    max_attempts,
                    remote_closed = e.is_remote_closed(),
                    retry_in_ms = delay.map(|d| d.as_millis() as u64),
                    error = %e,
                    "Feed fetch failed"
                );
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    tracing::warn!(
        feed = %source,
        attempts = max_attempts,
        "Feed still failing after all attempts, recording as failed"
    );
    FeedOutcome::failed(source, max_attempts)
}
