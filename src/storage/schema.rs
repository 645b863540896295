//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Walker database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    pages_stored INTEGER NOT NULL DEFAULT 0
);

-- One row per fetched document, keyed by origin URI
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY NOT NULL,
    title TEXT,
    text TEXT NOT NULL,
    source TEXT NOT NULL,
    last_update TEXT NOT NULL
);
"#;

/// Creates all tables if they do not exist yet
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
