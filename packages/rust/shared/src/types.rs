//! Core domain types for ProxyHarvest runs.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HarvestError;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The kind of proxy a run collects. Each category has its own source list
/// and output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Http,
    Socks4,
    Socks5,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Category; 3] = [Category::Http, Category::Socks4, Category::Socks5];

    /// Lowercase name used in file names and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        }
    }

    /// File name of the source URL list (e.g. `http.txt`).
    pub fn source_file_name(self) -> String {
        format!("{}.txt", self.as_str())
    }

    /// File name of the collected output (e.g. `http_proxies.txt`).
    pub fn output_file_name(self) -> String {
        format!("{}_proxies.txt", self.as_str())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = HarvestError;

    /// Accepts the category name (any case) or its legacy menu number.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "1" => Ok(Self::Http),
            "socks4" | "2" => Ok(Self::Socks4),
            "socks5" | "3" => Ok(Self::Socks5),
            _ => Err(HarvestError::UnknownCategory(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Dotted-quad IPv4 followed by a port. Digit counts only; octet and port
/// values are not range-checked.
static RECORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}:\d{1,5}$").expect("valid regex")
});

/// A validated `ip:port` endpoint.
///
/// Ordering is byte-wise on the underlying string, so `"10.0.0.1:80"` sorts
/// before `"9.0.0.1:80"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Record(String);

impl Record {
    /// Build a record from a single token, or `None` if the token is not
    /// exactly of the `ip:port` shape.
    pub fn new(token: &str) -> Option<Self> {
        RECORD_RE.is_match(token).then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// SourceSet
// ---------------------------------------------------------------------------

/// Ordered list of source URLs for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceSet(Vec<String>);

impl SourceSet {
    pub fn new(sources: Vec<String>) -> Self {
        Self(sources)
    }

    /// Parse a newline-delimited list, trimming each line and skipping blanks.
    pub fn parse(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<String> for SourceSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 identifier attached to every pipeline run for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// A source that contributed nothing to a run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// The source URL as listed.
    pub source: String,
    /// Human-readable cause (timeout, HTTP status, connection error, ...).
    pub cause: String,
}

/// Summary of one completed category run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub category: Category,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of sources in the source set.
    pub sources_attempted: usize,
    /// Lines received across all successful sources.
    pub raw_lines: usize,
    /// Lines that passed validation, before deduplication.
    pub valid_lines: usize,
    /// Unique records written to the output.
    pub records: usize,
    /// Where the records were written.
    pub output: PathBuf,
    /// Sources that failed, in source-list order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
}

impl RunOutcome {
    /// Number of sources that failed.
    pub fn sources_failed(&self) -> usize {
        self.failures.len()
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> std::time::Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}
