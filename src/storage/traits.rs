//! Storage traits and error types
//!
//! This module defines the trait interface for progress store backends and
//! associated error types.

use crate::state::ProgressRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid progress store id: {0}")]
    InvalidStoreId(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable completed/failed ledger keyed by a stable store id
///
/// Each job type owns exactly one store id, so post and comment progress
/// never collide. Implementations must be safe to share between tasks.
pub trait ProgressStore: Send + Sync {
    /// Loads the record for `store_id`
    ///
    /// Never fails: a missing record loads as empty, and an unreadable or
    /// corrupt record is logged and also loads as empty. The worst case is
    /// re-fetching items, never losing fetched content.
    fn load(&self, store_id: &str) -> ProgressRecord;

    /// Replaces the record for `store_id` with `record`
    ///
    /// The stored copy carries `last_update` set to the save time. The old
    /// record stays intact if the write does not complete.
    fn save(&self, store_id: &str, record: &ProgressRecord) -> StorageResult<()>;
}
