//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use proxyharvest_core::{Aggregator, CategoryPipeline, ProgressReporter};
use proxyharvest_fetcher::HttpFetcher;
use proxyharvest_shared::{
    AppConfig, Category, FetchConfig, RunOutcome, init_config, load_config, load_config_from,
};
use proxyharvest_storage::{FileStore, SourceStore};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ProxyHarvest — collect, validate and deduplicate public proxy lists.
#[derive(Parser)]
#[command(
    name = "proxyharvest",
    version,
    about = "Collect proxy lists from public sources into one clean file per type.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.proxyharvest/proxyharvest.toml.
    #[arg(long, global = true, env = "PROXYHARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Directory overrides shared by commands that touch the store.
#[derive(clap::Args, Default)]
pub(crate) struct PathArgs {
    /// Directory holding the per-category source URL lists.
    #[arg(long)]
    pub source_dir: Option<String>,

    /// Directory receiving the per-category proxy lists.
    #[arg(long)]
    pub output_dir: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, validate and deduplicate proxies for one or more categories.
    Collect {
        /// Categories to collect: http, socks4, socks5 (or 1, 2, 3).
        #[arg(required_unless_present = "all")]
        categories: Vec<Category>,

        /// Collect every category.
        #[arg(long, conflicts_with = "categories")]
        all: bool,

        #[command(flatten)]
        paths: PathArgs,

        /// Per-source timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Do not create missing source lists from the built-in defaults.
        #[arg(long)]
        no_init: bool,

        /// Print run summaries as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Manage the per-category source URL lists.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Source list subcommands.
#[derive(Subcommand)]
pub(crate) enum SourcesAction {
    /// Write the built-in source lists for categories that have none.
    Init {
        /// Overwrite existing lists as well.
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        paths: PathArgs,
    },
    /// Print the sources configured for a category.
    List {
        category: Category,

        #[command(flatten)]
        paths: PathArgs,
    },
    /// Print where source lists and results live.
    Path {
        #[command(flatten)]
        paths: PathArgs,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "proxyharvest=info",
        1 => "proxyharvest=debug",
        _ => "proxyharvest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Collect {
            categories,
            all,
            paths,
            timeout,
            no_init,
            json,
        } => {
            let categories = if all { Category::ALL.to_vec() } else { categories };
            let config = apply_overrides(config, &paths, timeout)?;
            cmd_collect(&config, &categories, !no_init, json).await
        }
        Command::Sources { action } => match action {
            SourcesAction::Init { force, paths } => {
                cmd_sources_init(&apply_overrides(config, &paths, None)?, force)
            }
            SourcesAction::List { category, paths } => {
                cmd_sources_list(&apply_overrides(config, &paths, None)?, category)
            }
            SourcesAction::Path { paths } => cmd_sources_path(&apply_overrides(config, &paths, None)?),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Layer CLI flags over the loaded config.
fn apply_overrides(mut config: AppConfig, paths: &PathArgs, timeout: Option<u64>) -> Result<AppConfig> {
    if let Some(dir) = &paths.source_dir {
        config.paths.source_dir = dir.clone();
    }
    if let Some(dir) = &paths.output_dir {
        config.paths.output_dir = dir.clone();
    }
    if let Some(secs) = timeout {
        config.fetch.timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_collect(
    config: &AppConfig,
    categories: &[Category],
    init_missing: bool,
    json: bool,
) -> Result<()> {
    let store = FileStore::from_config(&config.paths);

    if init_missing {
        for path in store.init_sources(false)? {
            eprintln!("Created source list {}", path.display());
        }
    }

    let fetch_config = FetchConfig::from(config);
    let fetcher = HttpFetcher::new(&fetch_config)?;
    let pipeline = CategoryPipeline::new(Aggregator::new(fetcher), &store, &store);

    let mut outcomes = Vec::with_capacity(categories.len());
    for &category in categories {
        info!(%category, timeout_secs = fetch_config.timeout.as_secs(), "collecting proxies");

        let reporter = CliProgress::new();
        let outcome = pipeline.run(category, &reporter).await;
        reporter.clear();
        let outcome = outcome?;

        if !json {
            for line in summary_lines(&outcome) {
                println!("{line}");
            }
        }
        outcomes.push(outcome);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    Ok(())
}

fn cmd_sources_init(config: &AppConfig, force: bool) -> Result<()> {
    let store = FileStore::from_config(&config.paths);
    let written = store.init_sources(force)?;

    if written.is_empty() {
        println!(
            "All source lists already exist in {} (use --force to overwrite).",
            store.source_dir().display()
        );
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_sources_list(config: &AppConfig, category: Category) -> Result<()> {
    let store = FileStore::from_config(&config.paths);
    let sources = store.load_sources(category)?;
    for source in &sources {
        println!("{source}");
    }
    Ok(())
}

fn cmd_sources_path(config: &AppConfig) -> Result<()> {
    let store = FileStore::from_config(&config.paths);
    for category in Category::ALL {
        println!(
            "{category:<7} {}  ->  {}",
            store.source_path(category).display(),
            store.output_path(category).display()
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

/// Human-readable summary of one run.
fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("  {} proxies collected", outcome.category),
        format!(
            "  Sources:  {} ({} failed)",
            outcome.sources_attempted,
            outcome.sources_failed()
        ),
        format!("  Lines:    {} received, {} valid", outcome.raw_lines, outcome.valid_lines),
        format!("  Unique:   {}", outcome.records),
        format!("  Saved to: {}", outcome.output.display()),
        format!("  Time:     {:.1}s", outcome.elapsed().as_secs_f64()),
    ];
    for failure in &outcome.failures {
        lines.push(format!("  ! {}: {}", failure.source, failure.cause));
    }
    lines.push(String::new());
    lines
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_finished(&self, source: &str, ok: bool, done: usize, total: usize) {
        let mark = if ok { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("Fetched [{done}/{total}] {source} ({mark})"));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}
