//! Database schema for fetched content
//!
//! The orchestrator itself never reads these tables; they hold what the HTTP
//! fetch capability retrieved so that a completed item is durable before it
//! is marked completed.

/// SQL schema for the content database
pub const SCHEMA_SQL: &str = r#"
-- One row per fetched page of one item for one job
CREATE TABLE IF NOT EXISTS fetched_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job TEXT NOT NULL,
    item TEXT NOT NULL,
    page_key TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    body TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    UNIQUE(job, item, page_key)
);

CREATE INDEX IF NOT EXISTS idx_fetched_pages_item ON fetched_pages(job, item);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_table_exists_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='fetched_pages'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
