//! End-to-end crawl cycles against a local HTTP server.
//!
//! Each test gets its own wiremock server and temp directory, so the link
//! store, snapshots and failure log are isolated.

use linkharvest::config::Config;
use linkharvest::crawl::{CrawlState, Crawler};
use linkharvest::feed::{HttpFeedClient, RetryPolicy};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Share channel A</title>
    <link>https://a.example</link>
    <description>test</description>
    <item>
      <title>合集 https://pan.baidu.com/s/1AbCdEf 提取码: x1y2</title>
      <description>备用 https://www.aliyundrive.com/s/QwErTy123</description>
    </item>
    <item>
      <title>磁力</title>
      <description>magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567</description>
    </item>
  </channel>
</rss>"#;

const ATOM_B: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Share channel B</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-09-03T01:10:42Z</updated>
  <entry>
    <title>Repost</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-09-03T01:10:42Z</updated>
    <summary>Same link again https://pan.baidu.com/s/1AbCdEf and https://pan.quark.cn/s/9f8e7d</summary>
  </entry>
</feed>"#;

fn config(dir: &TempDir, feeds: Vec<String>) -> Config {
    Config {
        rss_feeds: feeds,
        output_file: dir.path().join("all_links.txt"),
        snapshot_dir: dir.path().join("snapshots"),
        failed_log: dir.path().join("failed_feeds.log"),
        timeout: 2,
        retry_count: 2,
        ..Config::default()
    }
}

async fn crawler(cfg: &Config) -> Crawler<HttpFeedClient> {
    let client = HttpFeedClient::new(cfg.request_timeout()).unwrap();
    Crawler::new(cfg, client, RetryPolicy::immediate(cfg.retry_count)).unwrap()
}

async fn serve(server: &MockServer, route: &str, body: &str, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_cycles_then_nothing_new() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", RSS_A, "application/rss+xml").await;
    serve(&server, "/b.xml", ATOM_B, "application/atom+xml").await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &dir,
        vec![
            format!("{}/a.xml", server.uri()),
            format!("{}/b.xml", server.uri()),
        ],
    );
    let mut crawler = crawler(&cfg).await;

    let first = crawler.run_cycle().await;
    let mut urls: Vec<&str> = first.new_links.iter().map(|l| l.as_str()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://pan.baidu.com/s/1AbCdEf",
            "https://pan.quark.cn/s/9f8e7d",
            "https://www.aliyundrive.com/s/QwErTy123",
            "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
        ]
    );
    assert!(first.failed_sources.is_empty());
    assert!(first.is_clean());

    let snapshot = std::fs::read_to_string(first.snapshot.as_ref().unwrap()).unwrap();
    assert!(snapshot.starts_with("===== Crawl time: "));
    assert!(snapshot.contains("===== New links: 4 =====\n\n"));

    let second = crawler.run_cycle().await;
    assert_eq!(second.found, 4);
    assert_eq!(second.new_count(), 0);
    assert!(second.snapshot.is_none());
    assert_eq!(crawler.state(), CrawlState::Idle);

    let store = std::fs::read_to_string(&cfg.output_file).unwrap();
    assert_eq!(store.lines().count(), 4);
}

#[tokio::test]
async fn test_failing_feed_goes_to_failure_log() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", RSS_A, "application/rss+xml").await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let broken = format!("{}/broken.xml", server.uri());
    let cfg = config(&dir, vec![format!("{}/a.xml", server.uri()), broken.clone()]);
    let mut crawler = crawler(&cfg).await;

    let report = crawler.run_cycle().await;
    assert_eq!(report.failed_sources, vec![broken.clone()]);
    assert_eq!(report.new_count(), 3);

    let log = std::fs::read_to_string(&cfg.failed_log).unwrap();
    assert_eq!(log.matches("========== Crawl time:").count(), 1);
    assert!(log.contains(&format!("Failed feeds this cycle: 1\n{broken}\n")));
}

#[tokio::test]
async fn test_slow_feed_times_out_without_blocking_others() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", RSS_A, "application/rss+xml").await;
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ATOM_B)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(
        &dir,
        vec![
            format!("{}/a.xml", server.uri()),
            format!("{}/slow.xml", server.uri()),
        ],
    );
    cfg.timeout = 1;
    cfg.retry_count = 1;
    let mut crawler = crawler(&cfg).await;

    let report = crawler.run_cycle().await;
    assert_eq!(report.failed_sources.len(), 1);
    assert_eq!(report.new_count(), 3);
}

#[tokio::test]
async fn test_store_survives_restart() {
    let server = MockServer::start().await;
    serve(&server, "/a.xml", RSS_A, "application/rss+xml").await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, vec![format!("{}/a.xml", server.uri())]);

    let first = crawler(&cfg).await.run_cycle().await;
    assert_eq!(first.new_count(), 3);

    // A fresh crawler reloads the store from disk
    let mut restarted = crawler(&cfg).await;
    assert_eq!(restarted.store().len(), 3);
    let second = restarted.run_cycle().await;
    assert_eq!(second.new_count(), 0);
}
