//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus, StoredRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl engine shares one backend between workers behind a mutex, so
/// implementations only need to be `Send`.
pub trait Storage: Send {
    // ===== Documents =====

    /// Inserts a record, or fully replaces the record with the same `url`
    fn upsert(&mut self, record: &StoredRecord) -> StorageResult<()>;

    /// Gets the record stored for `url`
    fn get_record(&self, url: &str) -> StorageResult<Option<StoredRecord>>;

    /// Counts stored records
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `seed` - The URI the run starts from
    /// * `config_hash` - Hash of the configuration in effect
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run finished with its final status and stored page count
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_stored: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Counts recorded runs
    fn count_runs(&self) -> StorageResult<u64>;
}
