//! `reqwest`-backed fetcher.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use proxyharvest_shared::{FetchConfig, HarvestError, Result};

use crate::{Fetch, FetchError, RawBatch};

/// Fetches source lists over HTTP(S) with a per-request timeout.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the runtime fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarvestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    async fn try_fetch(&self, source: &str) -> std::result::Result<Vec<String>, FetchError> {
        let url = Url::parse(source).map_err(|e| FetchError::InvalidUrl(format!("{source}: {e}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        Ok(decode_lines(&body))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

impl Fetch for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, source: &str) -> RawBatch {
        match self.try_fetch(source).await {
            Ok(lines) => {
                debug!(lines = lines.len(), "source fetched");
                RawBatch::Fetched {
                    source: source.to_string(),
                    lines,
                }
            }
            Err(error) => {
                warn!(cause = %error, "source fetch failed");
                RawBatch::Failed {
                    source: source.to_string(),
                    error,
                }
            }
        }
    }
}

/// Decode a body as UTF-8 and split it into lines.
///
/// Invalid byte sequences are dropped rather than replaced, so a stray byte
/// inside an otherwise valid line does not poison it.
pub fn decode_lines(body: &[u8]) -> Vec<String> {
    let mut text = String::with_capacity(body.len());
    for chunk in body.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.lines().map(String::from).collect()
}
