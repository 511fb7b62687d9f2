//! Guba-Harvest main entry point
//!
//! This is the command-line interface for the batch forum crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use guba_harvest::config::{load_config_with_hash, Config};
use guba_harvest::crawler::{
    build_http_client, build_job, JobKind, JobResources, RetryCoordinator,
};
use guba_harvest::output::{
    load_statistics, print_job_report, print_retry_outcome, print_statistics,
};
use guba_harvest::source::load_work_items;
use guba_harvest::storage::{JsonProgressStore, SqliteContentSink};
use guba_harvest::WorkItem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Guba-Harvest: resumable batch crawler for stock forum posts and comments
///
/// Fetches every stock code of the catalog in bounded-concurrency batches,
/// checkpoints progress after each batch, resumes where it left off, and can
/// retry only the items that failed.
#[derive(Parser, Debug)]
#[command(name = "guba-harvest")]
#[command(version)]
#[command(about = "Resumable batch crawler for stock forum data", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Which job(s) to run
    #[arg(short, long, value_enum, default_value_t = Task::All)]
    task: Task,

    /// Re-fetch only the items recorded as failed
    #[arg(long, conflicts_with_all = ["fresh", "status", "dry_run"])]
    retry: bool,

    /// Reset the selected jobs' progress before running
    #[arg(long, conflicts_with_all = ["status", "dry_run"])]
    fresh: bool,

    /// Show stored progress and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    Posts,
    Comments,
    /// Posts first, then comments
    All,
}

impl Task {
    fn kinds(self) -> Vec<JobKind> {
        match self {
            Task::Posts => vec![JobKind::Posts],
            Task::Comments => vec![JobKind::Comments],
            Task::All => vec![JobKind::Posts, JobKind::Comments],
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.task)
    } else if cli.status {
        handle_status(&config, cli.task);
        Ok(())
    } else {
        handle_crawl(config, cli.task, cli.retry, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("guba_harvest=info,warn"),
            1 => EnvFilter::new("guba_harvest=debug,info"),
            2 => EnvFilter::new("guba_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, task: Task) -> anyhow::Result<()> {
    println!("=== Guba-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent workers: {}",
        config.crawler.max_concurrent_workers
    );
    println!("  Inter-batch delay: {}s", config.crawler.inter_batch_delay);
    match config.crawler.item_timeout {
        Some(secs) => println!("  Item timeout: {}s", secs),
        None => println!("  Item timeout: none"),
    }

    println!("\nOutput:");
    println!("  Progress directory: {}", config.output.progress_dir);
    println!("  Content database: {}", config.output.database_path);

    println!("\nJobs:");
    if let Some(posts) = &config.posts {
        println!(
            "  posts: pages {}-{}, progress '{}'",
            posts.start_page, posts.end_page, posts.progress_store_id
        );
        println!("    {}", posts.url_template);
    }
    if let Some(comments) = &config.comments {
        println!(
            "  comments: {} to {}, progress '{}'",
            comments.start_date, comments.end_date, comments.progress_store_id
        );
        println!("    {}", comments.url_template);
    }
    for kind in task.kinds() {
        if kind.store_id(config).is_none() {
            println!("  {}: not configured", kind);
        }
    }

    let items = load_work_items(&config.source)?;
    println!(
        "\nSource: {} ({} unique items)",
        config.source.stock_file,
        items.len()
    );

    let batches = items
        .len()
        .div_ceil(config.crawler.max_concurrent_workers as usize);
    println!("\n✓ Configuration is valid");
    println!(
        "✓ A fresh run would dispatch {} batches per job",
        batches
    );

    Ok(())
}

/// Handles the --status mode: shows stored progress for the selected jobs
fn handle_status(config: &Config, task: Task) {
    let store = JsonProgressStore::new(&config.output.progress_dir);
    println!("Progress directory: {}\n", store.dir().display());

    for kind in task.kinds() {
        match kind.store_id(config) {
            Some(store_id) => {
                let stats = load_statistics(&store, kind.name(), store_id);
                print_statistics(&stats);
            }
            None => println!("=== {}: not configured ===\n", kind),
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, task: Task, retry: bool, fresh: bool) -> anyhow::Result<()> {
    let client = build_http_client(&config.http).context("failed to build HTTP client")?;
    let sink = SqliteContentSink::new(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    let resources = JobResources {
        client,
        sink: Arc::new(sink),
        store: Arc::new(JsonProgressStore::new(&config.output.progress_dir)),
        shutdown: shutdown.clone(),
    };

    // Retry runs never need the catalog
    let items: Vec<WorkItem> = if retry {
        Vec::new()
    } else {
        load_work_items(&config.source)?
    };

    let mut failed_jobs = 0;
    for kind in task.kinds() {
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested, not starting {}", kind);
            break;
        }

        let job = match build_job(kind, &config, &resources) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Cannot start {} job: {}", kind, e);
                failed_jobs += 1;
                continue;
            }
        };

        if retry {
            tracing::info!("Retrying failed {} items", kind);
            let outcome = RetryCoordinator::new(&job).run().await;
            print_retry_outcome(kind.name(), &outcome);
            continue;
        }

        if fresh {
            if let Err(e) = job.reset_progress() {
                tracing::warn!("Could not reset {} progress: {}", kind, e);
            }
        }

        tracing::info!("Starting {} crawl over {} items", kind, items.len());
        let report = job.run(&items).await;
        print_job_report(&report);
    }

    if failed_jobs > 0 {
        anyhow::bail!("{} job(s) could not be started", failed_jobs);
    }
    Ok(())
}

/// Cancels `token` on Ctrl-C so the running job stops after its current batch
fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, finishing the current batch before stopping");
            token.cancel();
        }
    });
}
