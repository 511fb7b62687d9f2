//! SQLite sink for fetched content
//!
//! Workers run concurrently, so the connection sits behind a mutex. The lock
//! is taken only for the duration of one insert and never held across an
//! await point.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult};
use crate::state::WorkItem;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// A page fetched for one item
#[derive(Debug, Clone)]
pub struct FetchedPage<'a> {
    pub job: &'a str,
    pub item: &'a WorkItem,
    /// Distinguishes the pages of one item, e.g. `"page-3"` or a date range
    pub page_key: &'a str,
    pub url: &'a str,
    pub status_code: u16,
    pub body: &'a str,
}

/// SQLite storage for fetched pages
pub struct SqliteContentSink {
    conn: Mutex<Connection>,
}

impl SqliteContentSink {
    /// Opens or creates the content database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Stores a page, replacing an earlier copy of the same page
    pub fn store(&self, page: &FetchedPage<'_>) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO fetched_pages
                (job, item, page_key, url, status_code, body, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.job,
                page.item.as_str(),
                page.page_key,
                page.url,
                page.status_code,
                page.body,
                now
            ],
        )?;
        Ok(())
    }

    /// Counts stored pages for one item of one job
    pub fn count_pages(&self, job: &str, item: &WorkItem) -> StorageResult<u64> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fetched_pages WHERE job = ?1 AND item = ?2",
            params![job, item.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts every stored page of one job
    pub fn count_job_pages(&self, job: &str) -> StorageResult<u64> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fetched_pages WHERE job = ?1",
            params![job],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
