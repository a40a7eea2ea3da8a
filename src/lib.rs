//! Harvests cloud-drive share links, magnet URIs and ed2k links from RSS and
//! Atom feeds.
//!
//! Each crawl cycle fetches every configured feed (at most three at a time,
//! with jittered retries), extracts candidate links from entry text, keeps
//! the ones never seen before and appends them to a durable link store.

pub mod config;
pub mod crawl;
pub mod extract;
pub mod feed;
pub mod storage;
pub mod util;
