//! Scripted fetch capability for orchestrator tests

use crate::crawler::fetcher::{FetchCapability, FetchError, FetchParams};
use crate::state::WorkItem;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub fn items(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter().map(|id| WorkItem::from(*id)).collect()
}

/// Start and end of one fetch call
#[derive(Debug, Clone)]
pub struct CallSpan {
    pub item: WorkItem,
    pub started: Instant,
    pub finished: Instant,
}

/// Everything a `ScriptedFetcher` observed
#[derive(Debug, Default)]
pub struct CallLog {
    per_item: Mutex<HashMap<WorkItem, usize>>,
    spans: Mutex<Vec<CallSpan>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.per_item.lock().unwrap().values().sum()
    }

    pub fn count_for(&self, id: &str) -> usize {
        self.per_item
            .lock()
            .unwrap()
            .get(&WorkItem::from(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<CallSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn begin(&self, item: &WorkItem) -> usize {
        let mut per_item = self.per_item.lock().unwrap();
        let attempt = per_item.entry(item.clone()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;
        drop(per_item);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        attempt
    }
}

struct InFlight<'a> {
    log: &'a CallLog,
    item: WorkItem,
    started: Instant,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.log.spans.lock().unwrap().push(CallSpan {
            item: self.item.clone(),
            started: self.started,
            finished: Instant::now(),
        });
        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetcher whose behavior per item is fixed up front
#[derive(Default)]
pub struct ScriptedFetcher {
    always_fail: HashSet<WorkItem>,
    fail_first_attempt: HashSet<WorkItem>,
    panic_on: HashSet<WorkItem>,
    cancel_on: Option<(WorkItem, CancellationToken)>,
    latency: Duration,
    log: Arc<CallLog>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails these items on every attempt
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            always_fail: items(ids).into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fails these items on their first attempt only
    pub fn flaky_on(mut self, ids: &[&str]) -> Self {
        self.fail_first_attempt = items(ids).into_iter().collect();
        self
    }

    pub fn panic_on(mut self, ids: &[&str]) -> Self {
        self.panic_on = items(ids).into_iter().collect();
        self
    }

    /// Cancels `token` while fetching `id`, simulating an operator stop
    pub fn cancel_on(mut self, id: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((WorkItem::from(id), token));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shares the call log so tests can inspect it after handing the fetcher off
    pub fn with_log(mut self, log: Arc<CallLog>) -> Self {
        self.log = log;
        self
    }

    pub fn calls(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl FetchCapability for ScriptedFetcher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, item: &WorkItem, _params: &FetchParams) -> Result<(), FetchError> {
        let attempt = self.log.begin(item);
        let _guard = InFlight {
            log: &self.log,
            item: item.clone(),
            started: Instant::now(),
        };

        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == item {
                token.cancel();
            }
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.panic_on.contains(item) {
            panic!("scripted panic for {}", item);
        }
        if self.always_fail.contains(item) {
            return Err(FetchError::Other(format!("scripted failure for {}", item)));
        }
        if attempt == 1 && self.fail_first_attempt.contains(item) {
            return Err(FetchError::Other(format!("first attempt failed for {}", item)));
        }

        Ok(())
    }
}
