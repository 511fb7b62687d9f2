//! JSON file progress store
//!
//! One `<store_id>.json` file per job under a progress directory. Saves go
//! through a temporary sibling file that is fsynced and renamed over the
//! target, so a crash mid-write leaves the previous checkpoint in place.

use crate::config::validate_store_id;
use crate::state::ProgressRecord;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed progress store
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    dir: PathBuf,
}

impl JsonProgressStore {
    /// Creates a store rooted at `dir`
    ///
    /// The directory is created lazily on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the progress files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path used for `store_id`
    pub fn path_for(&self, store_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", store_id))
    }

    fn read_record(&self, path: &Path) -> StorageResult<Option<ProgressRecord>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let record: ProgressRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        let result = (|| -> StorageResult<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&tmp, path)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

impl ProgressStore for JsonProgressStore {
    fn load(&self, store_id: &str) -> ProgressRecord {
        if let Err(e) = validate_store_id(store_id) {
            tracing::warn!("Refusing to load progress for '{}': {}", store_id, e);
            return ProgressRecord::new();
        }

        let path = self.path_for(store_id);
        match self.read_record(&path) {
            Ok(Some(mut record)) => {
                let repaired = record.repair();
                if repaired > 0 {
                    tracing::warn!(
                        "Progress file {} listed {} item(s) as both completed and failed; keeping them as completed",
                        path.display(),
                        repaired
                    );
                }
                tracing::debug!(
                    "Loaded progress from {}: {} completed, {} failed",
                    path.display(),
                    record.completed.len(),
                    record.failed.len()
                );
                record
            }
            Ok(None) => {
                tracing::debug!("No progress file at {}, starting empty", path.display());
                ProgressRecord::new()
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read progress file {} ({}); starting from empty progress",
                    path.display(),
                    e
                );
                ProgressRecord::new()
            }
        }
    }

    fn save(&self, store_id: &str, record: &ProgressRecord) -> StorageResult<()> {
        validate_store_id(store_id)
            .map_err(|e| StorageError::InvalidStoreId(format!("{}: {}", store_id, e)))?;

        let mut snapshot = record.clone();
        snapshot.last_update = Some(Local::now().naive_local());

        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        let path = self.path_for(store_id);
        self.write_atomic(&path, &bytes)?;

        tracing::trace!("Saved progress to {}", path.display());
        Ok(())
    }
}
