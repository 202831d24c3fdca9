//! In-memory fetcher for exercising aggregation without a network.

use std::collections::HashMap;
use std::time::Duration;

use proxyharvest_fetcher::{Fetch, FetchError, RawBatch, decode_lines};

enum Response {
    Body(String, Duration),
    Fail(FetchError, Duration),
    Panic,
}

/// Serves canned bodies or failures per source, optionally after a delay.
/// Unknown sources answer with HTTP 404.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    responses: HashMap<String, Response>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn body(self, source: &str, body: &str) -> Self {
        self.body_after(source, body, Duration::ZERO)
    }

    pub(crate) fn body_after(mut self, source: &str, body: &str, delay: Duration) -> Self {
        self.responses
            .insert(source.to_string(), Response::Body(body.to_string(), delay));
        self
    }

    pub(crate) fn failure(self, source: &str, error: FetchError) -> Self {
        self.failure_after(source, error, Duration::ZERO)
    }

    pub(crate) fn failure_after(mut self, source: &str, error: FetchError, delay: Duration) -> Self {
        self.responses
            .insert(source.to_string(), Response::Fail(error, delay));
        self
    }

    pub(crate) fn panics(mut self, source: &str) -> Self {
        self.responses.insert(source.to_string(), Response::Panic);
        self
    }
}

impl Fetch for StaticFetcher {
    async fn fetch(&self, source: &str) -> RawBatch {
        match self.responses.get(source) {
            Some(Response::Body(body, delay)) => {
                tokio::time::sleep(*delay).await;
                RawBatch::Fetched {
                    source: source.to_string(),
                    lines: decode_lines(body.as_bytes()),
                }
            }
            Some(Response::Fail(error, delay)) => {
                tokio::time::sleep(*delay).await;
                RawBatch::Failed {
                    source: source.to_string(),
                    error: error.clone(),
                }
            }
            Some(Response::Panic) => panic!("fetcher blew up on {source}"),
            None => RawBatch::Failed {
                source: source.to_string(),
                error: FetchError::Status(404),
            },
        }
    }
}
