//! Retry of previously failed items
//!
//! Retrying is always an explicit operator action. There is no attempt cap
//! and no dead-letter set: an item that keeps failing stays in `failed` until
//! a later retry succeeds.

use crate::crawler::coordinator::{CrawlJob, JobReport};

/// Result of a retry request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The job's failed set was empty
    NothingToRetry,

    /// The failed items were re-run through the job loop
    Retried(JobReport),
}

/// Re-drives a job using only the failed items of its checkpoint
pub struct RetryCoordinator<'a> {
    job: &'a CrawlJob,
}

impl<'a> RetryCoordinator<'a> {
    pub fn new(job: &'a CrawlJob) -> Self {
        Self { job }
    }

    /// Runs the job over its currently failed items
    ///
    /// Items that succeed move from failed to completed; items that fail
    /// again stay failed. Calling this repeatedly never duplicates entries.
    pub async fn run(&self) -> RetryOutcome {
        let failed = self.job.load_progress().failed_items();

        if failed.is_empty() {
            tracing::info!("[{}] Nothing to retry", self.job.name());
            return RetryOutcome::NothingToRetry;
        }

        tracing::info!(
            "[{}] Retrying {} failed item(s)",
            self.job.name(),
            failed.len()
        );
        RetryOutcome::Retried(self.job.run(&failed).await)
    }
}
