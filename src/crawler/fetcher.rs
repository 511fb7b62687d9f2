//! Fetch capabilities
//!
//! This module defines:
//! - The `FetchCapability` trait the orchestrator invokes once per item
//! - The per-job `FetchParams` handed to every invocation
//! - `HttpFetcher`, the capability that downloads forum pages and stores
//!   them in the content sink before reporting success
//! - HTTP client construction and retry logic for transient failures

use crate::config::HttpConfig;
use crate::state::WorkItem;
use crate::storage::{FetchedPage, SqliteContentSink, StorageError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a single fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to store fetched content: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Other(String),
}

/// Job-specific parameters passed to every fetch of that job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchParams {
    /// Post lists: fetch pages `start..=end`
    PageRange { start: u32, end: u32 },

    /// Comments published between `start` and `end`, inclusive
    DateRange { start: NaiveDate, end: NaiveDate },

    /// No parameters beyond the item itself
    None,
}

/// An operation that retrieves the remote data for one work item
///
/// Implementations must be safe to call concurrently for distinct items and
/// must durably persist whatever they fetch before returning `Ok`. The
/// orchestrator treats any `Err` as a recoverable item-level failure.
#[async_trait]
pub trait FetchCapability: Send + Sync {
    /// Short label used in logs, e.g. `"posts"`
    fn name(&self) -> &str;

    /// Fetches `item` using the job's `params`
    async fn fetch(&self, item: &WorkItem, params: &FetchParams) -> Result<(), FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use guba_harvest::config::HttpConfig;
/// use guba_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fills the placeholders of a URL template
///
/// Recognized placeholders: `{code}`, `{page}`, `{start_date}`, `{end_date}`.
pub fn render_url(
    template: &str,
    item: &WorkItem,
    page: Option<u32>,
    dates: Option<(NaiveDate, NaiveDate)>,
) -> String {
    let mut url = template.replace("{code}", item.as_str());
    if let Some(page) = page {
        url = url.replace("{page}", &page.to_string());
    }
    if let Some((start, end)) = dates {
        url = url
            .replace("{start_date}", &start.format("%Y-%m-%d").to_string())
            .replace("{end_date}", &end.format("%Y-%m-%d").to_string());
    }
    url
}

/// HTTP fetch capability backed by a URL template
///
/// # Request Flow
///
/// | Params | Requests |
/// |--------|----------|
/// | `PageRange { start, end }` | one GET per page, `{page}` substituted |
/// | `DateRange { start, end }` | one GET, `{start_date}`/`{end_date}` substituted |
/// | `None` | one GET, only `{code}` substituted |
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Store body, continue |
/// | HTTP 5xx | Retry up to `max_retries` times after `retry_delay` |
/// | Transport error / timeout | Retry up to `max_retries` times after `retry_delay` |
/// | Other status (404, 429, ...) | Fail the item immediately |
pub struct HttpFetcher {
    job: String,
    url_template: String,
    client: Client,
    sink: Arc<SqliteContentSink>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(
        job: impl Into<String>,
        url_template: impl Into<String>,
        client: Client,
        sink: Arc<SqliteContentSink>,
    ) -> Self {
        Self {
            job: job.into(),
            url_template: url_template.into(),
            client,
            sink,
            max_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    /// Sets how many extra attempts transient failures get
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_and_store(
        &self,
        item: &WorkItem,
        page_key: &str,
        url: &str,
    ) -> Result<(), FetchError> {
        let (status_code, body) = self.get_with_retry(url).await?;

        self.sink.store(&FetchedPage {
            job: &self.job,
            item,
            page_key,
            url,
            status_code,
            body: &body,
        })?;

        tracing::trace!("[{}] stored {} for {} ({} bytes)", self.job, page_key, item, body.len());
        Ok(())
    }

    async fn get_with_retry(&self, url: &str) -> Result<(u16, String), FetchError> {
        let mut attempt = 0;
        loop {
            let error = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|source| FetchError::Http {
                            url: url.to_string(),
                            source,
                        })?;
                        return Ok((status.as_u16(), body));
                    }

                    let error = FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(source) => FetchError::Http {
                    url: url.to_string(),
                    source,
                },
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;

            tracing::debug!(
                "[{}] {} (retry {}/{} in {:?})",
                self.job,
                error,
                attempt,
                self.max_retries,
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

#[async_trait]
impl FetchCapability for HttpFetcher {
    fn name(&self) -> &str {
        &self.job
    }

    async fn fetch(&self, item: &WorkItem, params: &FetchParams) -> Result<(), FetchError> {
        match params {
            FetchParams::PageRange { start, end } => {
                for page in *start..=*end {
                    let url = render_url(&self.url_template, item, Some(page), None);
                    self.fetch_and_store(item, &format!("page-{}", page), &url)
                        .await?;
                }
            }
            FetchParams::DateRange { start, end } => {
                let url = render_url(&self.url_template, item, None, Some((*start, *end)));
                let key = format!("{}..{}", start, end);
                self.fetch_and_store(item, &key, &url).await?;
            }
            FetchParams::None => {
                let url = render_url(&self.url_template, item, None, None);
                self.fetch_and_store(item, "all", &url).await?;
            }
        }
        Ok(())
    }
}
