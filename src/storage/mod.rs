//! Storage module for persisting crawled documents
//!
//! The crawl engine only depends on the narrow [`Storage`] trait: upsert a
//! record keyed by its origin URI. Two backends are provided:
//! - [`SqliteStorage`]: the on-disk database used by the CLI
//! - [`MemoryStorage`]: a `HashMap` backend for tests and throwaway crawls
//!
//! Run bookkeeping (start/finish, status, pages stored) lives alongside the
//! page records.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Local};

/// C `ctime`-style layout used for the `last_update` field
pub const LAST_UPDATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A persisted document, keyed by `url`
///
/// Upserting a record whose `url` already exists replaces every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub title: Option<String>,
    pub url: String,
    pub text: String,
    pub source: String,
    pub last_update: String,
}

/// Formats a timestamp the way `last_update` is stored
pub fn format_last_update(at: &DateTime<Local>) -> String {
    at.format(LAST_UPDATE_FORMAT).to_string()
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub pages_stored: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
