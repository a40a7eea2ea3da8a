//! Feed crawling: fetch, retry and fan-out across sources.
//!
//! - [`parser`] - RSS/Atom bytes to [`FeedEntry`] values via `feed-rs`
//! - [`fetcher`] - the [`FeedClient`] capability and its HTTP implementation
//! - [`retry`] - per-feed attempt loop driven by a [`RetryPolicy`]
//! - [`scheduler`] - bounded concurrent fan-out producing a [`CrawlCycleResult`]
//!
//! # Example
//!
//! ```ignore
//! use linkharvest::feed::{fetch_feed, run_all, HttpFeedClient, RetryPolicy};
//!
//! let client = HttpFeedClient::new(Duration::from_secs(10))?;
//! let policy = RetryPolicy::default();
//! let cycle = run_all(&sources, 3, |source| fetch_feed(&client, source, &policy)).await;
//! ```

mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use fetcher::{FeedClient, FetchError, HttpFeedClient};
pub use parser::{parse_feed, FeedEntry};
pub use retry::{fetch_feed, FeedOutcome, RetryPolicy};
pub use scheduler::{effective_workers, run_all, CrawlCycleResult, HARD_CAP};
