use chrono::NaiveDate;
use serde::Deserialize;

/// Main configuration structure for Guba-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub posts: Option<PostsConfig>,
    pub comments: Option<CommentsConfig>,
}

/// Batch scheduling configuration shared by every job
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of items fetched concurrently (the batch size)
    #[serde(rename = "max-concurrent-workers", default = "default_workers")]
    pub max_concurrent_workers: u32,

    /// Pause between two batches (seconds)
    #[serde(rename = "inter-batch-delay", default = "default_delay")]
    pub inter_batch_delay: u64,

    /// Upper bound on a single item's fetch (seconds)
    #[serde(rename = "item-timeout", default)]
    pub item_timeout: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_workers(),
            inter_batch_delay: default_delay(),
            item_timeout: None,
        }
    }
}

/// Where the stock codes come from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Catalog file containing the stock codes
    #[serde(rename = "stock-file", default = "default_stock_file")]
    pub stock_file: String,

    /// Regex whose first capture group is a stock code
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            stock_file: default_stock_file(),
            pattern: default_pattern(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Extra attempts on 5xx responses and transport errors
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before each extra attempt (seconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one progress file per job
    #[serde(rename = "progress-dir", default = "default_progress_dir")]
    pub progress_dir: String,

    /// Path to the SQLite database receiving fetched content
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress_dir: default_progress_dir(),
            database_path: default_database_path(),
        }
    }
}

/// Post list crawl: one request per page in `start_page..=end_page`
#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
    /// URL with `{code}` and `{page}` placeholders
    #[serde(rename = "url-template")]
    pub url_template: String,

    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    #[serde(rename = "end-page", default = "default_end_page")]
    pub end_page: u32,

    #[serde(rename = "progress-store-id", default = "default_post_store")]
    pub progress_store_id: String,
}

/// Comment crawl restricted to a date range
#[derive(Debug, Clone, Deserialize)]
pub struct CommentsConfig {
    /// URL with `{code}`, `{start_date}` and `{end_date}` placeholders
    #[serde(rename = "url-template")]
    pub url_template: String,

    #[serde(rename = "start-date", default = "default_start_date")]
    pub start_date: NaiveDate,

    #[serde(rename = "end-date", default = "default_end_date")]
    pub end_date: NaiveDate,

    #[serde(rename = "progress-store-id", default = "default_comment_store")]
    pub progress_store_id: String,
}

fn default_workers() -> u32 {
    3
}

fn default_delay() -> u64 {
    30
}

fn default_stock_file() -> String {
    "industries.py".to_string()
}

fn default_pattern() -> String {
    r"'代码': '(\d+)'".to_string()
}

fn default_user_agent() -> String {
    format!("guba-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    5
}

fn default_progress_dir() -> String {
    ".".to_string()
}

fn default_database_path() -> String {
    "./guba.db".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> u32 {
    100
}

fn default_post_store() -> String {
    "post_progress".to_string()
}

fn default_comment_store() -> String {
    "comment_progress".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 28).unwrap_or_default()
}
