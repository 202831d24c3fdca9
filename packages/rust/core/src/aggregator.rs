//! Concurrent fan-out over a source set, followed by validation and a
//! set-semantics merge.
//!
//! Every source gets its own task; there is no concurrency cap. The merge
//! only starts once every task has finished, so nothing is shared between
//! tasks and the result does not depend on completion order.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use proxyharvest_fetcher::{Fetch, FetchError, RawBatch};
use proxyharvest_shared::{Record, SourceFailure, SourceSet};

use crate::validator::validate;

/// Advisory counters for one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    /// Every line of every fetched body, blank lines included. A body is
    /// split as-is, so this can exceed a count taken after trimming it.
    pub raw_lines: usize,
    pub valid_lines: usize,
    pub unique_records: usize,
}

/// Output of one aggregation: the sorted, duplicate-free result set plus
/// what happened along the way.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Unique records in ascending byte-wise order.
    pub records: Vec<Record>,
    pub stats: AggregateStats,
    /// Failed sources in the order their batches were merged.
    pub failures: Vec<SourceFailure>,
}

/// Merge fetched batches into a result set.
///
/// Pure and order-insensitive with respect to `records`: any permutation of
/// the same batches yields the same records.
pub fn merge<I>(batches: I) -> Aggregation
where
    I: IntoIterator<Item = RawBatch>,
{
    let mut stats = AggregateStats::default();
    let mut failures = Vec::new();
    let mut unique = BTreeSet::new();

    for batch in batches {
        stats.sources_attempted += 1;

        if let Some(error) = batch.error() {
            stats.sources_failed += 1;
            failures.push(SourceFailure {
                source: batch.source().to_string(),
                cause: error.to_string(),
            });
            continue;
        }

        for line in batch.lines() {
            stats.raw_lines += 1;
            if let Some(record) = validate(line) {
                stats.valid_lines += 1;
                unique.insert(record);
            }
        }
    }

    stats.unique_records = unique.len();

    Aggregation {
        records: unique.into_iter().collect(),
        stats,
        failures,
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Fans a [`Fetch`] implementation out over a source set.
pub struct Aggregator<F> {
    fetcher: Arc<F>,
}

impl<F> Clone for Aggregator<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F: Fetch> Aggregator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    /// Fetch every source concurrently, wait for all of them, and merge.
    pub async fn aggregate(&self, sources: &SourceSet) -> Aggregation {
        self.aggregate_with_progress(sources, |_, _, _| {}).await
    }

    /// Like [`aggregate`](Self::aggregate), calling `on_batch(batch, done, total)`
    /// as each source finishes, in completion order.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub async fn aggregate_with_progress<P>(&self, sources: &SourceSet, mut on_batch: P) -> Aggregation
    where
        P: FnMut(&RawBatch, usize, usize),
    {
        let total = sources.len();
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(total);

        for (index, source) in sources.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let source = source.clone();
            let handle = tasks.spawn(async move { (index, fetcher.fetch(&source).await) });
            task_index.insert(handle.id(), index);
        }

        // Barrier: collect every batch before merging anything.
        let mut slots: Vec<Option<RawBatch>> = vec![None; total];
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            let (index, batch) = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    let index = task_index[&e.id()];
                    let source = &sources.as_slice()[index];
                    warn!(source = %source, error = %e, "fetch task aborted");
                    let batch = RawBatch::Failed {
                        source: source.clone(),
                        error: FetchError::Aborted(e.to_string()),
                    };
                    (index, batch)
                }
            };
            done += 1;
            on_batch(&batch, done, total);
            slots[index] = Some(batch);
        }

        // Merge in source-list order so failures are reported predictably.
        let aggregation = merge(slots.into_iter().flatten());

        let stats = &aggregation.stats;
        info!(
            sources_attempted = stats.sources_attempted,
            sources_failed = stats.sources_failed,
            raw_lines = stats.raw_lines,
            valid_lines = stats.valid_lines,
            unique_records = stats.unique_records,
            "aggregation complete"
        );

        aggregation
    }
}
