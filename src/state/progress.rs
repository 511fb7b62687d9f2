use crate::state::WorkItem;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Durable completed/failed classification for one job
///
/// `completed` and `failed` are kept disjoint: every mutation moves the item
/// out of the other set, so the latest outcome for an item wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub completed: BTreeSet<WorkItem>,

    #[serde(default)]
    pub failed: BTreeSet<WorkItem>,

    /// Local wall-clock time of the last save
    #[serde(default, with = "last_update_format")]
    pub last_update: Option<NaiveDateTime>,
}

impl ProgressRecord {
    /// Creates an empty record, as used on a job's first run
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful fetch
    pub fn mark_completed(&mut self, item: &WorkItem) {
        self.failed.remove(item);
        self.completed.insert(item.clone());
    }

    /// Records a failed fetch
    pub fn mark_failed(&mut self, item: &WorkItem) {
        self.completed.remove(item);
        self.failed.insert(item.clone());
    }

    pub fn is_completed(&self, item: &WorkItem) -> bool {
        self.completed.contains(item)
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    /// Returns the failed items in their stable (sorted) order
    pub fn failed_items(&self) -> Vec<WorkItem> {
        self.failed.iter().cloned().collect()
    }

    /// Returns true if no item is both completed and failed
    pub fn is_disjoint(&self) -> bool {
        self.completed.is_disjoint(&self.failed)
    }

    /// Drops failed entries that are also completed
    ///
    /// Returns the number of entries removed. A record written by an older
    /// tool may list an item in both sets after a successful retry; the
    /// success is authoritative.
    pub fn repair(&mut self) -> usize {
        let overlap: Vec<WorkItem> = self.completed.intersection(&self.failed).cloned().collect();
        for item in &overlap {
            self.failed.remove(item);
        }
        overlap.len()
    }
}

/// `YYYY-MM-DD HH:MM:SS`, the layout used by existing progress files
mod last_update_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
