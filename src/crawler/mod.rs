//! Crawler module for batch fetching and progress tracking
//!
//! This module contains the core orchestration logic, including:
//! - The fetch capability seam and the HTTP implementation
//! - Batch scheduling with a strict barrier between batches
//! - The per-job loop that persists progress after every batch
//! - Retrying only the failed subset of a previous run

mod coordinator;
mod fetcher;
mod retry;
mod scheduler;

#[cfg(test)]
mod test_support;

pub use coordinator::{CrawlJob, JobConfig, JobReport};
pub use fetcher::{
    build_http_client, render_url, FetchCapability, FetchError, FetchParams, HttpFetcher,
};
pub use retry::{RetryCoordinator, RetryOutcome};
pub use scheduler::{Batch, BatchOutcome, BatchScheduler};

use crate::config::Config;
use crate::storage::{ProgressStore, SqliteContentSink};
use crate::ConfigError;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The job types this crawler knows how to build from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Post lists over a page range
    Posts,

    /// Comments over a date range
    Comments,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Comments => "comments",
        }
    }

    /// The progress store id this job uses, if its section is configured
    pub fn store_id<'a>(&self, config: &'a Config) -> Option<&'a str> {
        match self {
            Self::Posts => config.posts.as_ref().map(|p| p.progress_store_id.as_str()),
            Self::Comments => config
                .comments
                .as_ref()
                .map(|c| c.progress_store_id.as_str()),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared collaborators every job built from configuration uses
#[derive(Clone)]
pub struct JobResources {
    pub client: Client,
    pub sink: Arc<SqliteContentSink>,
    pub store: Arc<dyn ProgressStore>,
    pub shutdown: CancellationToken,
}

/// Builds the job of the given kind from configuration
///
/// # Returns
///
/// * `Ok(CrawlJob)` - The job is ready to run
/// * `Err(ConfigError)` - The job's section is missing or invalid
pub fn build_job(
    kind: JobKind,
    config: &Config,
    resources: &JobResources,
) -> Result<CrawlJob, ConfigError> {
    let (template, store_id, params) = match kind {
        JobKind::Posts => {
            let posts = config
                .posts
                .as_ref()
                .ok_or(ConfigError::MissingSection("posts"))?;
            (
                &posts.url_template,
                &posts.progress_store_id,
                FetchParams::PageRange {
                    start: posts.start_page,
                    end: posts.end_page,
                },
            )
        }
        JobKind::Comments => {
            let comments = config
                .comments
                .as_ref()
                .ok_or(ConfigError::MissingSection("comments"))?;
            (
                &comments.url_template,
                &comments.progress_store_id,
                FetchParams::DateRange {
                    start: comments.start_date,
                    end: comments.end_date,
                },
            )
        }
    };

    let fetcher = HttpFetcher::new(
        kind.name(),
        template.clone(),
        resources.client.clone(),
        Arc::clone(&resources.sink),
    )
    .with_retries(
        config.http.max_retries,
        Duration::from_secs(config.http.retry_delay),
    );

    let job_config = JobConfig::from_crawler_config(&config.crawler, params);

    let job = CrawlJob::new(
        kind.name(),
        store_id.clone(),
        Arc::new(fetcher),
        Arc::clone(&resources.store),
        job_config,
    )?
    .with_shutdown(resources.shutdown.clone());

    Ok(job)
}
