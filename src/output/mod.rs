//! Output module for progress summaries and job reports
//!
//! This module handles:
//! - Reporting completed/failed counts and failed items after a job
//! - Summarizing stored checkpoints for `--status`

pub mod stats;

pub use stats::{
    load_statistics, print_job_report, print_retry_outcome, print_statistics, ProgressStatistics,
};
