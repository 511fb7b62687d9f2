use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of fetch work, e.g. a stock code
///
/// The orchestrator never looks inside a work item; it only compares,
/// hashes and orders it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItem {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WorkItem {
    fn from(id: String) -> Self {
        Self(id)
    }
}
