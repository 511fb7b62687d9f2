//! Guba-Harvest: a resumable batch crawler for stock forum data
//!
//! This crate drives fetches for a large set of stock codes through a
//! rate-limited source in bounded-concurrency batches, records per-item
//! completion and failure durably, resumes after interruption, and retries
//! only the failed subset.

pub mod config;
pub mod crawler;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Guba-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read work items from {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid item pattern: {0}")]
    InvalidPattern(String),

    #[error("No [{0}] section in configuration")]
    MissingSection(&'static str),
}

/// Result type alias for Guba-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlJob, FetchCapability, JobConfig, JobReport, RetryCoordinator};
pub use state::{ItemOutcome, ProgressRecord, WorkItem};
pub use storage::{JsonProgressStore, MemoryProgressStore, ProgressStore};
