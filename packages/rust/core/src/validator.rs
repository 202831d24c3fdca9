//! Line classification: raw source line → [`Record`] or rejection.
//!
//! Source lists are loosely formatted. Many append a country code, latency
//! or a comment after the endpoint, so only the first whitespace-delimited
//! token of a line is considered.

use proxyharvest_shared::Record;

/// Classify one raw line. Returns the record if the line's first token is an
/// `ip:port` endpoint.
pub fn validate(line: &str) -> Option<Record> {
    let token = line.split_whitespace().next()?;
    Record::new(token)
}
