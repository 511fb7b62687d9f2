//! Crawl job - main batch orchestration logic
//!
//! This module contains the job loop that coordinates one named task:
//! - Loading the job's progress checkpoint
//! - Computing the pending items (everything not yet completed)
//! - Running pending items batch by batch through the scheduler
//! - Classifying outcomes and persisting progress after every batch
//! - Pausing between batches and stopping cleanly on shutdown
//!
//! The progress record is owned by the driving loop. Workers only return
//! outcomes; classification and persistence happen after the batch barrier,
//! on one task, so the record needs no lock.

use crate::config::{validate_store_id, CrawlerConfig};
use crate::crawler::fetcher::{FetchCapability, FetchParams};
use crate::crawler::scheduler::BatchScheduler;
use crate::state::{ProgressRecord, WorkItem};
use crate::storage::{ProgressStore, StorageResult};
use crate::ConfigError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per-job scheduling parameters, fixed for the job's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Batch size and therefore the peak number of concurrent fetches
    pub max_concurrent_workers: usize,

    /// Pause between two batches; never applied after the last batch
    pub inter_batch_delay: Duration,

    /// Upper bound on a single fetch
    pub item_timeout: Option<Duration>,

    pub fetch_params: FetchParams,
}

impl JobConfig {
    /// Creates a config with no inter-batch delay and no item timeout
    pub fn new(max_concurrent_workers: usize, fetch_params: FetchParams) -> Self {
        Self {
            max_concurrent_workers,
            inter_batch_delay: Duration::ZERO,
            item_timeout: None,
            fetch_params,
        }
    }

    /// Builds a job config from the `[crawler]` section
    pub fn from_crawler_config(crawler: &CrawlerConfig, fetch_params: FetchParams) -> Self {
        Self {
            max_concurrent_workers: crawler.max_concurrent_workers as usize,
            inter_batch_delay: Duration::from_secs(crawler.inter_batch_delay),
            item_timeout: crawler.item_timeout.map(Duration::from_secs),
            fetch_params,
        }
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_workers < 1 {
            return Err(ConfigError::Validation(
                "max_concurrent_workers must be >= 1".to_string(),
            ));
        }
        if self.item_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Validation(
                "item timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a job run did, reported to the caller at Done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Job name, e.g. `"posts"`
    pub job: String,

    /// Batches dispatched in this run
    pub batches: usize,

    /// Items fetched in this run
    pub attempted: usize,

    /// Items that succeeded in this run
    pub succeeded: usize,

    /// Items that failed in this run
    pub failed_this_run: usize,

    /// Completed items in the progress record after the run
    pub completed_count: usize,

    /// Failed items in the progress record after the run
    pub failed_count: usize,

    /// The failed items, so an operator can decide to retry
    pub failed_items: Vec<WorkItem>,

    /// True if shutdown stopped the job before pending items ran out
    pub interrupted: bool,
}

impl JobReport {
    fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            ..Self::default()
        }
    }

    fn finish(&mut self, record: &ProgressRecord) {
        self.completed_count = record.completed.len();
        self.failed_count = record.failed.len();
        self.failed_items = record.failed_items();
    }
}

/// A named task bound to its fetch capability and progress checkpoint
pub struct CrawlJob {
    name: String,
    store_id: String,
    fetcher: Arc<dyn FetchCapability>,
    store: Arc<dyn ProgressStore>,
    scheduler: BatchScheduler,
    params: Arc<FetchParams>,
    config: JobConfig,
    shutdown: CancellationToken,
}

impl CrawlJob {
    /// Creates a job
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs and reports
    /// * `store_id` - Identity of this job's progress checkpoint
    /// * `fetcher` - The capability invoked once per item
    /// * `store` - Where progress is loaded from and saved to
    /// * `config` - Batch size, delay, timeout and fetch parameters
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlJob)` - The job is ready to run
    /// * `Err(ConfigError)` - A parameter is invalid; no other job is affected
    pub fn new(
        name: impl Into<String>,
        store_id: impl Into<String>,
        fetcher: Arc<dyn FetchCapability>,
        store: Arc<dyn ProgressStore>,
        config: JobConfig,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let store_id = store_id.into();

        if name.trim().is_empty() {
            return Err(ConfigError::Validation("job name cannot be empty".to_string()));
        }
        validate_store_id(&store_id)?;
        config.validate()?;

        let scheduler =
            BatchScheduler::new(config.max_concurrent_workers).with_item_timeout(config.item_timeout);

        Ok(Self {
            name,
            store_id,
            fetcher,
            store,
            scheduler,
            params: Arc::new(config.fetch_params.clone()),
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Stops the job at the next batch boundary once `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Loads this job's current progress record
    pub fn load_progress(&self) -> ProgressRecord {
        self.store.load(&self.store_id)
    }

    /// Overwrites this job's checkpoint with an empty record
    pub fn reset_progress(&self) -> StorageResult<()> {
        tracing::info!("[{}] Resetting progress '{}'", self.name, self.store_id);
        self.store.save(&self.store_id, &ProgressRecord::new())
    }

    /// Runs the job over `all_items` until every pending item has been tried
    ///
    /// Items already completed in the checkpoint are skipped. Items recorded
    /// as failed are tried again. Fetch failures and progress store failures
    /// never abort the run.
    pub async fn run(&self, all_items: &[WorkItem]) -> JobReport {
        let start_time = Instant::now();
        let mut report = JobReport::new(&self.name);

        let mut record = self.store.load(&self.store_id);
        let pending = pending_items(all_items, &record);

        tracing::info!(
            "[{}] Pending: {}, completed: {}, failed: {}",
            self.name,
            pending.len(),
            record.completed.len(),
            record.failed.len()
        );

        if pending.is_empty() {
            tracing::info!("[{}] Nothing pending", self.name);
            report.finish(&record);
            return report;
        }

        let batches = self.scheduler.plan(&pending);
        let total_batches = batches.len();

        for batch in &batches {
            if batch.index > 0 {
                self.pause_between_batches().await;
            }
            if self.shutdown.is_cancelled() {
                tracing::info!(
                    "[{}] Shutdown requested, stopping before batch {}/{}",
                    self.name,
                    batch.index + 1,
                    total_batches
                );
                report.interrupted = true;
                break;
            }

            tracing::info!(
                "==== [{}] Batch {}/{}: items {}-{} of {} ====",
                self.name,
                batch.index + 1,
                total_batches,
                batch.offset + 1,
                batch.offset + batch.len(),
                pending.len()
            );

            let outcome = self
                .scheduler
                .run_batch(batch, &self.fetcher, &self.params)
                .await;

            for item in &batch.items {
                match outcome.get(item) {
                    Some(result) if result.is_success() => {
                        record.mark_completed(item);
                        report.succeeded += 1;
                    }
                    _ => {
                        record.mark_failed(item);
                        report.failed_this_run += 1;
                    }
                }
            }
            report.batches += 1;
            report.attempted += batch.len();

            if let Err(e) = self.store.save(&self.store_id, &record) {
                tracing::warn!(
                    "[{}] Failed to persist progress after batch {} ({}); continuing",
                    self.name,
                    batch.index + 1,
                    e
                );
            }

            tracing::info!(
                "[{}] Batch {}/{} done: {} ok, {} failed (total completed: {}, failed: {})",
                self.name,
                batch.index + 1,
                total_batches,
                outcome.succeeded(),
                outcome.failed(),
                record.completed.len(),
                record.failed.len()
            );
        }

        report.finish(&record);

        tracing::info!(
            "[{}] Finished in {:?}: {} completed, {} failed{}",
            self.name,
            start_time.elapsed(),
            report.completed_count,
            report.failed_count,
            if report.interrupted { " (interrupted)" } else { "" }
        );
        if !report.failed_items.is_empty() {
            tracing::info!("[{}] Failed items: {:?}", self.name, report.failed_items);
        }

        report
    }

    /// Sleeps the inter-batch delay, waking early on shutdown
    async fn pause_between_batches(&self) {
        let delay = self.config.inter_batch_delay;
        if delay.is_zero() {
            return;
        }

        tracing::info!("[{}] Waiting {:?} before the next batch", self.name, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

/// Items of `all_items` not yet completed, first occurrence order, no duplicates
fn pending_items(all_items: &[WorkItem], record: &ProgressRecord) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    all_items
        .iter()
        .filter(|item| !record.is_completed(item))
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}
