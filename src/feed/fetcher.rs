use crate::feed::parser::{parse_feed, FeedEntry};
use futures::StreamExt;
use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!("linkharvest/", env!("CARGO_PKG_VERSION"));

/// Messages that mean the remote host dropped the connection without ever
/// answering. Matched case-insensitively against every error in the chain.
const REMOTE_CLOSED_SIGNATURES: &[&str] = &[
    "remote end closed connection without response",
    "connection closed before message completed",
];

/// Errors that can occur while fetching and parsing one feed.
///
/// Everything except [`FetchError::Parse`] is a transport failure. All of
/// them are retried from the same attempt budget.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection refused, TLS, reset, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The host closed the connection before sending a response
    #[error("Remote closed connection without response: {0}")]
    RemoteClosed(String),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Feed document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether the host is actively refusing to answer, which earns a longer
    /// pause before the next attempt.
    pub fn is_remote_closed(&self) -> bool {
        matches!(self, FetchError::RemoteClosed(_))
    }

    /// Classifies a reqwest failure, promoting the remote-closed signature
    /// out of the generic network bucket.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if has_remote_closed_signature(&err) {
            FetchError::RemoteClosed(error_chain(&err))
        } else {
            FetchError::Network(err)
        }
    }
}

fn has_remote_closed_signature(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if is_remote_closed_message(&e.to_string()) {
            return true;
        }
        current = e.source();
    }
    false
}

pub(crate) fn is_remote_closed_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    REMOTE_CLOSED_SIGNATURES
        .iter()
        .any(|sig| lowered.contains(sig))
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

/// Fetch-and-parse capability for one feed source.
///
/// The retry controller only ever talks to this trait, so tests can script
/// failures without a network.
pub trait FeedClient: Send + Sync {
    fn fetch_entries(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<Vec<FeedEntry>, FetchError>> + Send;
}

/// [`FeedClient`] over HTTP(S) with one pooled `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedClient {
    /// Builds a client whose requests (headers and body) must finish within
    /// `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Plain GET returning the body bytes, with the size and completeness
    /// checks applied.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(FetchError::from_transport)?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, MAX_FEED_SIZE).await
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}

impl FeedClient for HttpFeedClient {
    async fn fetch_entries(&self, source: &str) -> Result<Vec<FeedEntry>, FetchError> {
        let bytes = self.get_bytes(source).await?;
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_transport)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
