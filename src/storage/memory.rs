//! In-process progress store
//!
//! Keeps records in a map instead of on disk. Useful for embedding the
//! orchestrator and for tests that need to observe how often the job saves.

use crate::state::ProgressRecord;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use chrono::Local;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Progress store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `record` under `store_id`
    pub fn with_record(store_id: &str, record: ProgressRecord) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.lock() {
            records.insert(store_id.to_string(), record);
        }
        store
    }

    /// Number of successful saves so far, across all store ids
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every subsequent save fail with an IO error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, store_id: &str) -> ProgressRecord {
        match self.records.lock() {
            Ok(records) => records.get(store_id).cloned().unwrap_or_default(),
            Err(_) => {
                tracing::warn!("Progress map lock poisoned; starting '{}' empty", store_id);
                ProgressRecord::new()
            }
        }
    }

    fn save(&self, store_id: &str, record: &ProgressRecord) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }

        let mut snapshot = record.clone();
        snapshot.last_update = Some(Local::now().naive_local());

        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.insert(store_id.to_string(), snapshot);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
