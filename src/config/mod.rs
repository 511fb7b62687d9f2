//! Configuration module for Guba-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The configuration is loaded once at startup and passed down explicitly; no
//! component reads it from process-wide state.
//!
//! # Example
//!
//! ```no_run
//! use guba_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Batch size: {}", config.crawler.max_concurrent_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CommentsConfig, Config, CrawlerConfig, HttpConfig, OutputConfig, PostsConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub(crate) use validation::validate_store_id;
