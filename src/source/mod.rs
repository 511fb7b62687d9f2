//! Work item source
//!
//! Extracts stock codes from a catalog file. The catalog is any text file;
//! every match of the configured pattern contributes its first capture group.
//! Deduplication happens here, before the orchestrator sees the list.

use crate::config::SourceConfig;
use crate::state::WorkItem;
use crate::{ConfigError, HarvestError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Reads the catalog named in `config` and returns its unique work items
///
/// Items keep the order of their first occurrence in the file.
pub fn load_work_items(config: &SourceConfig) -> Result<Vec<WorkItem>> {
    let path = Path::new(&config.stock_file);
    let content = std::fs::read_to_string(path).map_err(|source| HarvestError::Source {
        path: path.to_path_buf(),
        source,
    })?;

    let pattern = Regex::new(&config.pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", config.pattern, e)))?;

    let items = extract_work_items(&content, &pattern);
    tracing::info!(
        "Extracted {} unique items from {}",
        items.len(),
        path.display()
    );
    Ok(items)
}

/// Collects the first capture group of every match, without duplicates
pub fn extract_work_items(content: &str, pattern: &Regex) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|code| seen.insert(code.to_string()))
        .map(WorkItem::from)
        .collect()
}
