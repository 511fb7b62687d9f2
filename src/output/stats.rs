//! Progress statistics and job reports
//!
//! This module turns progress records and job reports into the operator
//! facing summaries printed after a run or by `--status`.

use crate::crawler::{JobReport, RetryOutcome};
use crate::state::WorkItem;
use crate::storage::ProgressStore;
use chrono::NaiveDateTime;

/// Snapshot of one job's progress checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStatistics {
    /// Job name, e.g. `"posts"`
    pub job: String,

    /// Store id the checkpoint was read from
    pub store_id: String,

    pub completed: usize,

    pub failed: usize,

    /// Failed items, sorted
    pub failed_items: Vec<WorkItem>,

    pub last_update: Option<NaiveDateTime>,
}

/// Loads statistics for one job's checkpoint
///
/// # Arguments
///
/// * `store` - The progress store to read from
/// * `job` - Job name used for display
/// * `store_id` - The job's checkpoint id
pub fn load_statistics(store: &dyn ProgressStore, job: &str, store_id: &str) -> ProgressStatistics {
    let record = store.load(store_id);
    ProgressStatistics {
        job: job.to_string(),
        store_id: store_id.to_string(),
        completed: record.completed.len(),
        failed: record.failed.len(),
        failed_items: record.failed_items(),
        last_update: record.last_update,
    }
}

/// Prints checkpoint statistics to stdout
pub fn print_statistics(stats: &ProgressStatistics) {
    println!("=== Progress: {} ({}) ===\n", stats.job, stats.store_id);

    println!("  Completed: {}", stats.completed);
    println!("  Failed: {}", stats.failed);
    match stats.last_update {
        Some(ts) => println!("  Last update: {}", ts.format("%Y-%m-%d %H:%M:%S")),
        None => println!("  Last update: never"),
    }

    if !stats.failed_items.is_empty() {
        println!("\n  Failed items ({}):", stats.failed_items.len());
        println!("    {}", join_items(&stats.failed_items));
    }
    println!();
}

/// Prints the report of a finished job run to stdout
pub fn print_job_report(report: &JobReport) {
    println!("=== {} crawl finished ===", report.job);

    if report.interrupted {
        println!("  Stopped early on shutdown request; rerun to resume");
    }
    println!(
        "  This run: {} attempted in {} batches ({} ok, {} failed)",
        report.attempted, report.batches, report.succeeded, report.failed_this_run
    );
    println!(
        "  Overall: {} completed, {} failed",
        report.completed_count, report.failed_count
    );

    if !report.failed_items.is_empty() {
        println!("  Failed items: {}", join_items(&report.failed_items));
        println!("  Run again with --retry to re-fetch only these items");
    }
    println!();
}

/// Prints the result of a retry request to stdout
pub fn print_retry_outcome(job: &str, outcome: &RetryOutcome) {
    match outcome {
        RetryOutcome::NothingToRetry => println!("=== {}: nothing to retry ===\n", job),
        RetryOutcome::Retried(report) => print_job_report(report),
    }
}

fn join_items(items: &[WorkItem]) -> String {
    items
        .iter()
        .map(WorkItem::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
