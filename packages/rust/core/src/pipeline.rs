//! End-to-end category run: source list → fan-out fetch → merge → output file.

use chrono::Utc;
use tracing::{Span, info, instrument};

use proxyharvest_fetcher::Fetch;
use proxyharvest_shared::{Category, Result, RunId, RunOutcome};
use proxyharvest_storage::{RecordSink, SourceStore};

use crate::aggregator::Aggregator;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each source finishes, in completion order.
    fn source_finished(&self, source: &str, ok: bool, done: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_finished(&self, _source: &str, _ok: bool, _done: usize, _total: usize) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

/// Binds a source store and a record sink to an aggregator.
pub struct CategoryPipeline<'a, F> {
    aggregator: Aggregator<F>,
    sources: &'a dyn SourceStore,
    sink: &'a dyn RecordSink,
}

impl<'a, F: Fetch> CategoryPipeline<'a, F> {
    pub fn new(aggregator: Aggregator<F>, sources: &'a dyn SourceStore, sink: &'a dyn RecordSink) -> Self {
        Self {
            aggregator,
            sources,
            sink,
        }
    }

    /// Run one category.
    ///
    /// Fails before any fetch if the category has no source list. Source
    /// failures never fail the run; they are reported in the outcome.
    #[instrument(skip_all, fields(category = %category, run_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        category: Category,
        progress: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        let run_id = RunId::new();
        Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();

        progress.phase("Loading sources");
        let sources = self.sources.load_sources(category)?;

        info!(sources = sources.len(), "collecting from sources");
        progress.phase(&format!("Fetching {} sources", sources.len()));

        let aggregation = self
            .aggregator
            .aggregate_with_progress(&sources, |batch, done, total| {
                progress.source_finished(batch.source(), batch.is_success(), done, total);
            })
            .await;

        progress.phase("Writing results");
        let output = self.sink.write_records(category, &aggregation.records)?;

        let stats = aggregation.stats;
        let outcome = RunOutcome {
            run_id,
            category,
            started_at,
            finished_at: Utc::now(),
            sources_attempted: stats.sources_attempted,
            raw_lines: stats.raw_lines,
            valid_lines: stats.valid_lines,
            records: stats.unique_records,
            output,
            failures: aggregation.failures,
        };

        info!(
            records = outcome.records,
            sources_failed = outcome.sources_failed(),
            output = %outcome.output.display(),
            elapsed_ms = outcome.elapsed().as_millis(),
            "run complete"
        );

        progress.done(&outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use proxyharvest_fetcher::{FetchError, HttpFetcher};
    use proxyharvest_shared::{FetchConfig, HarvestError};
    use proxyharvest_storage::FileStore;
    use uuid::Uuid;

    use super::*;
    use crate::testing::StaticFetcher;

    fn temp_store(tag: &str) -> (PathBuf, FileStore) {
        let root = std::env::temp_dir().join(format!("ph-pipeline-{tag}-{}", Uuid::now_v7()));
        let store = FileStore::new(root.join("source"), root.join("proxy"));
        std::fs::create_dir_all(store.source_dir()).unwrap();
        (root, store)
    }

    fn write_sources(store: &FileStore, category: Category, urls: &[&str]) {
        std::fs::write(store.source_path(category), urls.join("\n")).unwrap();
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.events.lock().unwrap().push(format!("phase:{name}"));
        }
        fn source_finished(&self, source: &str, ok: bool, _done: usize, _total: usize) {
            self.events.lock().unwrap().push(format!("source:{source}:{ok}"));
        }
        fn done(&self, outcome: &RunOutcome) {
            self.events.lock().unwrap().push(format!("done:{}", outcome.records));
        }
    }

    #[tokio::test]
    async fn missing_sources_fail_fast_without_output() {
        let (root, store) = temp_store("missing");
        let pipeline = CategoryPipeline::new(Aggregator::new(StaticFetcher::new()), &store, &store);

        let err = pipeline
            .run(Category::Socks5, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::MissingSources { category: Category::Socks5, .. }));
        assert!(err.is_configuration());
        assert!(!store.output_path(Category::Socks5).exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn partial_failure_still_writes_output() {
        let (root, store) = temp_store("partial");
        write_sources(&store, Category::Http, &["http://ok/list", "http://down/list"]);

        let fetcher = StaticFetcher::new()
            .body("http://ok/list", "1.1.1.1:80\n2.2.2.2:81\nbadline\n")
            .failure("http://down/list", FetchError::Timeout(Duration::from_secs(30)));
        let pipeline = CategoryPipeline::new(Aggregator::new(fetcher), &store, &store);

        let progress = RecordingProgress::default();
        let outcome = pipeline.run(Category::Http, &progress).await.unwrap();

        assert_eq!(outcome.category, Category::Http);
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.sources_attempted, 2);
        assert_eq!(outcome.sources_failed(), 1);
        assert_eq!(outcome.raw_lines, 3);
        assert_eq!(outcome.valid_lines, 2);
        assert_eq!(outcome.output, store.output_path(Category::Http));
        assert_eq!(
            std::fs::read_to_string(&outcome.output).unwrap(),
            "1.1.1.1:80\n2.2.2.2:81\n"
        );

        let events = progress.events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("phase:Loading sources"));
        assert!(events.contains(&"source:http://down/list:false".to_string()));
        assert!(events.contains(&"source:http://ok/list:true".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("done:2"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn rerun_overwrites_previous_output() {
        let (root, store) = temp_store("rerun");
        write_sources(&store, Category::Socks4, &["http://a/list"]);

        let first = CategoryPipeline::new(
            Aggregator::new(StaticFetcher::new().body("http://a/list", "7.7.7.7:1080\n8.8.8.8:1080\n")),
            &store,
            &store,
        );
        first.run(Category::Socks4, &SilentProgress).await.unwrap();

        let second = CategoryPipeline::new(
            Aggregator::new(StaticFetcher::new().body("http://a/list", "6.6.6.6:1080\n")),
            &store,
            &store,
        );
        let outcome = second.run(Category::Socks4, &SilentProgress).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&outcome.output).unwrap(),
            "6.6.6.6:1080\n"
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn all_sources_failing_is_still_a_run() {
        let (root, store) = temp_store("all-down");
        write_sources(&store, Category::Http, &["http://x/list", "http://y/list"]);

        let pipeline = CategoryPipeline::new(Aggregator::new(StaticFetcher::new()), &store, &store);
        let outcome = pipeline.run(Category::Http, &SilentProgress).await.unwrap();

        assert_eq!(outcome.records, 0);
        assert_eq!(outcome.sources_failed(), 2);
        assert_eq!(std::fs::read_to_string(&outcome.output).unwrap(), "");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/a.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("3.3.3.3:8080\nnot a proxy\n10.1.1.1:3128 US\n"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/b.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("3.3.3.3:8080\r\n\r\n"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/slow.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("4.4.4.4:4444\n")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing.txt"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (root, store) = temp_store("http");
        let uri = server.uri();
        let urls: Vec<String> = ["a.txt", "b.txt", "slow.txt", "missing.txt"]
            .iter()
            .map(|name| format!("{uri}/{name}"))
            .collect();
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        write_sources(&store, Category::Http, &urls);

        let config = FetchConfig {
            timeout: Duration::from_millis(500),
            ..FetchConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let pipeline = CategoryPipeline::new(Aggregator::new(fetcher), &store, &store);

        let outcome = pipeline.run(Category::Http, &SilentProgress).await.unwrap();

        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.sources_failed(), 2);
        let causes: Vec<&str> = outcome.failures.iter().map(|f| f.cause.as_str()).collect();
        assert_eq!(causes, ["timed out after 0.5s", "HTTP 404"]);
        assert_eq!(
            std::fs::read_to_string(&outcome.output).unwrap(),
            "10.1.1.1:3128\n3.3.3.3:8080\n"
        );

        let _ = std::fs::remove_dir_all(&root);
    }
}
