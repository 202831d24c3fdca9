//! Source retrieval for ProxyHarvest.
//!
//! This crate provides:
//! - [`Fetch`] — the seam the aggregator fans out over
//! - [`RawBatch`] — one source's lines, or the reason it produced none
//! - [`HttpFetcher`] — the `reqwest`-backed implementation
//!
//! A fetch never returns an error to its caller. Every failure is folded into
//! [`RawBatch::Failed`] so one bad source cannot abort a run.

mod http;

use std::future::Future;
use std::time::Duration;

pub use http::{HttpFetcher, decode_lines};

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Why a single source contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The source entry is not a usable URL.
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the configured timeout.
    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The response body could not be read to completion.
    #[error("failed to read body: {0}")]
    Body(String),

    /// Any other request-level failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The fetch task panicked or was cancelled before producing a batch.
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

// ---------------------------------------------------------------------------
// RawBatch
// ---------------------------------------------------------------------------

/// The unprocessed result of fetching one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBatch {
    /// The body was retrieved and split into lines.
    Fetched { source: String, lines: Vec<String> },
    /// The source failed; it contributes no lines.
    Failed { source: String, error: FetchError },
}

impl RawBatch {
    /// Source URL this batch came from.
    pub fn source(&self) -> &str {
        match self {
            Self::Fetched { source, .. } | Self::Failed { source, .. } => source,
        }
    }

    /// Lines of the body; empty for a failed source.
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Fetched { lines, .. } => lines,
            Self::Failed { .. } => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    /// The failure cause, if this source failed.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Fetched { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Retrieves one source. Implementations must be cheap to share across tasks
/// and must report every failure as [`RawBatch::Failed`].
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, source: &str) -> impl Future<Output = RawBatch> + Send;
}
