//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WorkItem`: the opaque identifier of one unit of fetch work
//! - `ItemOutcome`: the explicit success/failure result of one fetch
//! - `ProgressRecord`: the completed/failed ledger persisted after every batch

mod outcome;
mod progress;
mod work_item;

// Re-export main types
pub use outcome::ItemOutcome;
pub use progress::ProgressRecord;
pub use work_item::WorkItem;
