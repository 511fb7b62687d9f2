//! Batch scheduler
//!
//! This module handles:
//! - Partitioning pending items into batches of at most `max_concurrent_workers`
//! - Running one tokio task per item of a batch
//! - Waiting for every task of the batch before returning (the batch barrier)
//! - Turning fetch errors, timeouts and worker panics into per-item failures
//!
//! The scheduler owns no durable state. Outcomes travel back through each
//! worker's own `JoinHandle`, paired with its item at spawn time, so no result
//! buffer is shared between workers.

use crate::crawler::fetcher::{FetchCapability, FetchParams};
use crate::state::{ItemOutcome, WorkItem};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A group of items processed concurrently between two barriers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based position of this batch in the plan
    pub index: usize,

    /// Position of the first item within the pending list
    pub offset: usize,

    pub items: Vec<WorkItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcomes of one batch, indexed by item
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    outcomes: HashMap<WorkItem, ItemOutcome>,
}

impl BatchOutcome {
    pub fn get(&self, item: &WorkItem) -> Option<&ItemOutcome> {
        self.outcomes.get(item)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of items that succeeded
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    /// Number of items that failed
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkItem, &ItemOutcome)> {
        self.outcomes.iter()
    }
}

/// Splits work into fixed-size waves and runs each wave to completion
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    max_concurrent_workers: usize,
    item_timeout: Option<Duration>,
}

impl BatchScheduler {
    /// Creates a scheduler; a worker limit of zero is treated as one
    pub fn new(max_concurrent_workers: usize) -> Self {
        Self {
            max_concurrent_workers: max_concurrent_workers.max(1),
            item_timeout: None,
        }
    }

    /// Fails any single fetch that runs longer than `timeout`
    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn max_concurrent_workers(&self) -> usize {
        self.max_concurrent_workers
    }

    /// Partitions `pending` into consecutive batches, preserving order
    ///
    /// Every batch holds `min(max_concurrent_workers, remaining)` items.
    pub fn plan(&self, pending: &[WorkItem]) -> Vec<Batch> {
        pending
            .chunks(self.max_concurrent_workers)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                offset: index * self.max_concurrent_workers,
                items: chunk.to_vec(),
            })
            .collect()
    }

    /// Runs one batch and waits for all of its workers
    ///
    /// Never fails: each item ends up with exactly one outcome, whatever its
    /// worker did.
    pub async fn run_batch(
        &self,
        batch: &Batch,
        fetcher: &Arc<dyn FetchCapability>,
        params: &Arc<FetchParams>,
    ) -> BatchOutcome {
        let (items, handles): (Vec<WorkItem>, Vec<_>) = batch
            .items
            .iter()
            .map(|item| {
                let worker_item = item.clone();
                let fetcher = Arc::clone(fetcher);
                let params = Arc::clone(params);
                let timeout = self.item_timeout;
                let handle = tokio::spawn(async move {
                    run_worker(fetcher, worker_item, params, timeout).await
                });
                (item.clone(), handle)
            })
            .unzip();

        let joined = join_all(handles).await;

        let mut outcomes = HashMap::with_capacity(items.len());
        for (item, result) in items.into_iter().zip(joined) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => ItemOutcome::failure("worker panicked"),
                Err(e) => ItemOutcome::failure(format!("worker did not finish: {}", e)),
            };

            match &outcome {
                ItemOutcome::Success => tracing::debug!("[{}] {} succeeded", fetcher.name(), item),
                ItemOutcome::Failure { reason } => {
                    tracing::warn!("[{}] {} failed: {}", fetcher.name(), item, reason)
                }
            }
            outcomes.insert(item, outcome);
        }

        BatchOutcome { outcomes }
    }
}

/// Runs one fetch and captures whatever happens as an outcome
async fn run_worker(
    fetcher: Arc<dyn FetchCapability>,
    item: WorkItem,
    params: Arc<FetchParams>,
    timeout: Option<Duration>,
) -> ItemOutcome {
    tracing::debug!("[{}] fetching {}", fetcher.name(), item);

    let attempt = fetcher.fetch(&item, &params);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => return ItemOutcome::failure(format!("timed out after {:?}", limit)),
        },
        None => attempt.await,
    };

    match result {
        Ok(()) => ItemOutcome::Success,
        Err(e) => ItemOutcome::failure(e.to_string()),
    }
}
