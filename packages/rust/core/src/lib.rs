//! Core collection pipeline for ProxyHarvest.
//!
//! This crate ties the fetcher, validator and storage together into a
//! per-category run (see [`pipeline::CategoryPipeline`]).

pub mod aggregator;
pub mod pipeline;
pub mod validator;

#[cfg(test)]
mod testing;

pub use aggregator::{AggregateStats, Aggregation, Aggregator, merge};
pub use pipeline::{CategoryPipeline, ProgressReporter, SilentProgress};
pub use validator::validate;
