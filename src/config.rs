//! Configuration file parser.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Both TOML and the JSON layout (`config.json`) are accepted; the format is
//! chosen by file extension. Unknown keys are accepted but logged.
use crate::feed::RetryPolicy;
use crate::util::validate_url;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid JSON in config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

const KNOWN_KEYS: [&str; 8] = [
    "rss_feeds",
    "output_file",
    "interval",
    "concurrent_requests",
    "timeout",
    "retry_count",
    "snapshot_dir",
    "failed_log",
];

/// Harvester configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URIs to poll each cycle.
    pub rss_feeds: Vec<String>,

    /// Link store: every accepted link, one per line.
    pub output_file: PathBuf,

    /// Seconds to sleep between cycles in continuous mode.
    pub interval: u64,

    /// Requested parallel fetches. Capped at [`crate::feed::HARD_CAP`].
    pub concurrent_requests: usize,

    /// Per-request timeout in seconds.
    pub timeout: u64,

    /// Attempts per feed per cycle.
    pub retry_count: u32,

    pub snapshot_dir: PathBuf,

    pub failed_log: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rss_feeds: Vec::new(),
            output_file: PathBuf::from("all_links.txt"),
            interval: 3600,
            concurrent_requests: 5,
            timeout: 10,
            retry_count: 3,
            snapshot_dir: PathBuf::from("."),
            failed_log: PathBuf::from("failed_feeds.log"),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML or JSON file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - `*.json` → parsed as JSON, anything else as TOML
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            if let Ok(serde_json::Value::Object(raw)) =
                serde_json::from_str::<serde_json::Value>(&content)
            {
                warn_unknown_keys(raw.keys());
            }
            serde_json::from_str(&content)?
        } else {
            if let Ok(raw) = content.parse::<toml::Table>() {
                warn_unknown_keys(raw.keys());
            }
            toml::from_str(&content)?
        };

        tracing::info!(
            path = %path.display(),
            feeds = config.rss_feeds.len(),
            interval = config.interval,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Rejects values the crawler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count == 0 {
            return Err(ConfigError::Invalid(
                "retry_count must be at least 1".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Invalid(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Feed URIs that passed URL validation, in file order, without repeats.
    pub fn feed_sources(&self) -> Vec<String> {
        self.split_feed_sources().0
    }

    /// Splits `rss_feeds` into `(valid, rejected)`, both in file order and
    /// without repeats. Blank entries are neither.
    pub fn split_feed_sources(&self) -> (Vec<String>, Vec<String>) {
        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(self.rss_feeds.len());
        let mut rejected = Vec::new();

        for raw in &self.rss_feeds {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            if !seen.insert(raw.to_string()) {
                tracing::debug!(feed = %raw, "Duplicate feed in config, skipping");
                continue;
            }
            match validate_url(raw) {
                Ok(_) => sources.push(raw.to_string()),
                Err(e) => {
                    tracing::warn!(feed = %raw, error = %e, "Ignoring invalid feed URL");
                    rejected.push(raw.to_string());
                }
            }
        }
        (sources, rejected)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Default backoff and jitter, with this config's attempt budget.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.retry_count)
    }
}

fn warn_unknown_keys<'a>(keys: impl Iterator<Item = &'a String>) {
    for key in keys {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.rss_feeds.is_empty());
        assert_eq!(config.output_file, PathBuf::from("all_links.txt"));
        assert_eq!(config.interval, 3600);
        assert_eq!(config.concurrent_requests, 5);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.failed_log, PathBuf::from("failed_feeds.log"));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.interval, 3600);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.retry_count, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults_for_missing() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "interval = 60\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval, 60);
        assert_eq!(config.timeout, 10);
        assert!(config.rss_feeds.is_empty());
    }

    #[test]
    fn test_full_toml() {
        let dir = tempdir().unwrap();
        let content = r#"
rss_feeds = ["https://a.example/rss", "https://b.example/atom"]
output_file = "links.txt"
interval = 900
concurrent_requests = 2
timeout = 20
retry_count = 5
snapshot_dir = "snapshots"
failed_log = "failed.log"
"#;
        let path = write(dir.path(), "config.toml", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rss_feeds.len(), 2);
        assert_eq!(config.output_file, PathBuf::from("links.txt"));
        assert_eq!(config.interval, 900);
        assert_eq!(config.concurrent_requests, 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.retry_policy().attempts(), 5);
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.failed_log, PathBuf::from("failed.log"));
    }

    #[test]
    fn test_json_config() {
        let dir = tempdir().unwrap();
        let content = r#"{
            "rss_feeds": ["https://a.example/rss"],
            "output_file": "all_links.txt",
            "interval": 1800,
            "concurrent_requests": 3
        }"#;
        let path = write(dir.path(), "config.json", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rss_feeds, vec!["https://a.example/rss".to_string()]);
        assert_eq!(config.interval, 1800);
        assert_eq!(config.concurrent_requests, 3);
        assert_eq!(config.retry_count, 3);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_invalid_json_returns_error() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.json", "{ \"interval\": ");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = tempdir().unwrap();
        let content = "interval = 5\ntotally_fake_key = \"x\"\n";
        let path = write(dir.path(), "config.toml", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval, 5);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "interval = \"hourly\"\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.toml", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_validate_rejects_zero_retry_and_timeout() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.retry_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.retry_count = 3;
        config.timeout = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_feed_sources_drop_invalid_and_duplicates() {
        let config = Config {
            rss_feeds: vec![
                "https://a.example/rss".to_string(),
                "ftp://b.example/rss".to_string(),
                "not a url".to_string(),
                " https://c.example/feed ".to_string(),
                "https://a.example/rss".to_string(),
            ],
            ..Config::default()
        };

        assert_eq!(
            config.feed_sources(),
            vec![
                "https://a.example/rss".to_string(),
                "https://c.example/feed".to_string(),
            ]
        );
    }

    #[test]
    fn test_split_feed_sources_keeps_rejected() {
        let config = Config {
            rss_feeds: vec![
                "https://a.example/rss".to_string(),
                "example.com/rss".to_string(),
                "".to_string(),
                "ftp://b.example/rss".to_string(),
                "example.com/rss".to_string(),
            ],
            ..Config::default()
        };

        let (valid, rejected) = config.split_feed_sources();
        assert_eq!(valid, vec!["https://a.example/rss".to_string()]);
        assert_eq!(
            rejected,
            vec![
                "example.com/rss".to_string(),
                "ftp://b.example/rss".to_string(),
            ]
        );
    }
}
