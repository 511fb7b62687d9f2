//! Storage module for persisting crawl state
//!
//! This module handles:
//! - Progress stores: the per-job completed/failed checkpoint used for resumption
//! - The SQLite content sink that keeps what the HTTP fetcher retrieved

mod content;
mod json;
mod memory;
mod schema;
mod traits;

pub use content::{FetchedPage, SqliteContentSink};
pub use json::JsonProgressStore;
pub use memory::MemoryProgressStore;
pub use schema::initialize_schema;
pub use traits::{ProgressStore, StorageError, StorageResult};
