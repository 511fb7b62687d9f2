//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full fetch, checkpoint and retry cycle end-to-end.

use guba_harvest::config::parse_config;
use guba_harvest::crawler::{
    build_job, FetchCapability, FetchParams, HttpFetcher, JobKind, JobResources, RetryOutcome,
};
use guba_harvest::storage::{JsonProgressStore, ProgressStore, SqliteContentSink};
use guba_harvest::{RetryCoordinator, WorkItem};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(code: &str) -> WorkItem {
    WorkItem::from(code)
}

/// Builds a config whose jobs point at the mock server
fn config_for(base_url: &str) -> String {
    format!(
        r#"
[crawler]
max-concurrent-workers = 2
inter-batch-delay = 0

[http]
max-retries = 0
retry-delay = 0

[posts]
url-template = "{base}/list/{{code}}/{{page}}"
start-page = 1
end-page = 2

[comments]
url-template = "{base}/comments/{{code}}?from={{start_date}}&to={{end_date}}"
start-date = "2025-02-01"
end-date = "2025-02-28"
"#,
        base = base_url
    )
}

#[tokio::test]
async fn test_http_fetcher_stores_every_page() {
    let mock_server = MockServer::start().await;

    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/list/600519/{}", page)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {}", page)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(
        "posts",
        format!("{}/list/{{code}}/{{page}}", mock_server.uri()),
        Client::new(),
        Arc::clone(&sink),
    );

    fetcher
        .fetch(&item("600519"), &FetchParams::PageRange { start: 1, end: 3 })
        .await
        .expect("all pages should be fetched");

    assert_eq!(sink.count_pages("posts", &item("600519")).unwrap(), 3);
    assert_eq!(sink.count_job_pages("comments").unwrap(), 0);
}

#[tokio::test]
async fn test_http_fetcher_date_range_single_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/comments/000001"))
        .and(query_param("from", "2025-02-01"))
        .and(query_param("to", "2025-02-28"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(
        "comments",
        format!(
            "{}/comments/{{code}}?from={{start_date}}&to={{end_date}}",
            mock_server.uri()
        ),
        Client::new(),
        Arc::clone(&sink),
    );

    let params = FetchParams::DateRange {
        start: chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        end: chrono::NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
    };
    fetcher.fetch(&item("000001"), &params).await.unwrap();

    assert_eq!(sink.count_pages("comments", &item("000001")).unwrap(), 1);
}

#[tokio::test]
async fn test_http_fetcher_retries_server_errors() {
    let mock_server = MockServer::start().await;

    // First matching mock wins until it is exhausted
    Mock::given(method("GET"))
        .and(path("/list/300750/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/300750/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(
        "posts",
        format!("{}/list/{{code}}/{{page}}", mock_server.uri()),
        Client::new(),
        Arc::clone(&sink),
    )
    .with_retries(2, Duration::from_millis(10));

    fetcher
        .fetch(&item("300750"), &FetchParams::PageRange { start: 1, end: 1 })
        .await
        .expect("second attempt should succeed");

    assert_eq!(sink.count_pages("posts", &item("300750")).unwrap(), 1);
}

#[tokio::test]
async fn test_http_fetcher_fails_after_exhausting_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(
        "posts",
        format!("{}/list/{{code}}/{{page}}", mock_server.uri()),
        Client::new(),
        Arc::clone(&sink),
    )
    .with_retries(2, Duration::from_millis(10));

    let result = fetcher
        .fetch(&item("600000"), &FetchParams::PageRange { start: 1, end: 5 })
        .await;

    assert!(result.is_err());
    assert_eq!(sink.count_pages("posts", &item("600000")).unwrap(), 0);
}

#[tokio::test]
async fn test_http_fetcher_does_not_retry_client_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(
        "posts",
        format!("{}/list/{{code}}/{{page}}", mock_server.uri()),
        Client::new(),
        sink,
    )
    .with_retries(3, Duration::from_millis(10));

    let err = fetcher
        .fetch(&item("999999"), &FetchParams::PageRange { start: 1, end: 1 })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_full_crawl_resume_and_retry() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    // 000002 is broken during the first run
    Mock::given(method("GET"))
        .and(path("/list/000002/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let config = parse_config(&config_for(&mock_server.uri())).unwrap();
    let store = Arc::new(JsonProgressStore::new(temp_dir.path()));
    let sink = Arc::new(SqliteContentSink::new_in_memory().unwrap());
    let resources = JobResources {
        client: Client::new(),
        sink: Arc::clone(&sink),
        store: store.clone(),
        shutdown: CancellationToken::new(),
    };
    let job = build_job(JobKind::Posts, &config, &resources).unwrap();

    let items: Vec<WorkItem> = ["000001", "000002", "000003"]
        .iter()
        .map(|code| item(code))
        .collect();

    // First run: two successes, one failure, two batches
    let report = job.run(&items).await;
    assert_eq!(report.batches, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed_items, vec![item("000002")]);
    assert!(temp_dir.path().join("post_progress.json").exists());

    let record = store.load("post_progress");
    assert!(record.is_completed(&item("000001")));
    assert!(record.is_completed(&item("000003")));
    assert!(record.failed.contains(&item("000002")));
    assert!(record.last_update.is_some());

    // Second run: completed items are skipped, only 000002 goes out again
    let report = job.run(&items).await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed_items, vec![item("000002")]);
    assert_eq!(report.completed_count, 2);

    // Fix the endpoint and retry only the failure
    mock_server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let outcome = RetryCoordinator::new(&job).run().await;
    match outcome {
        RetryOutcome::Retried(report) => {
            assert_eq!(report.attempted, 1);
            assert_eq!(report.succeeded, 1);
            assert_eq!(report.failed_count, 0);
            assert_eq!(report.completed_count, 3);
        }
        RetryOutcome::NothingToRetry => panic!("expected a retry run"),
    }

    assert_eq!(
        RetryCoordinator::new(&job).run().await,
        RetryOutcome::NothingToRetry
    );
    assert_eq!(sink.count_job_pages("posts").unwrap(), 6);
}

#[tokio::test]
async fn test_jobs_keep_separate_progress() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let config = parse_config(&config_for(&mock_server.uri())).unwrap();
    let store = Arc::new(JsonProgressStore::new(temp_dir.path()));
    let resources = JobResources {
        client: Client::new(),
        sink: Arc::new(SqliteContentSink::new_in_memory().unwrap()),
        store: store.clone(),
        shutdown: CancellationToken::new(),
    };

    let items = vec![item("600519")];
    let posts = build_job(JobKind::Posts, &config, &resources).unwrap();
    posts.run(&items).await;

    // Posts finishing says nothing about comments
    let comments = build_job(JobKind::Comments, &config, &resources).unwrap();
    let report = comments.run(&items).await;
    assert_eq!(report.attempted, 1);

    assert!(temp_dir.path().join("post_progress.json").exists());
    assert!(temp_dir.path().join("comment_progress.json").exists());
    assert_eq!(store.load("post_progress").completed.len(), 1);
    assert_eq!(store.load("comment_progress").completed.len(), 1);
}

#[tokio::test]
async fn test_cancelled_job_dispatches_nothing() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = parse_config(&config_for(&mock_server.uri())).unwrap();
    let shutdown = CancellationToken::new();
    let resources = JobResources {
        client: Client::new(),
        sink: Arc::new(SqliteContentSink::new_in_memory().unwrap()),
        store: Arc::new(JsonProgressStore::new(temp_dir.path())),
        shutdown: shutdown.clone(),
    };
    let job = build_job(JobKind::Posts, &config, &resources).unwrap();

    shutdown.cancel();
    let report = job.run(&[item("600519"), item("000001")]).await;

    assert!(report.interrupted);
    assert_eq!(report.attempted, 0);
}
