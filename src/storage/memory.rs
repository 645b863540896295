//! In-memory storage backend
//!
//! Keeps everything in hash maps; nothing survives the process. Useful for
//! tests and for crawls whose output is only inspected in-process.

use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredRecord};
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: HashMap<String, StoredRecord>,
    runs: Vec<RunRecord>,
    upserts: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `upsert` calls received, including replacements
    pub fn upsert_calls(&self) -> u64 {
        self.upserts
    }

    /// Iterates over all stored records in no particular order
    pub fn records(&self) -> impl Iterator<Item = &StoredRecord> {
        self.records.values()
    }
}

impl Storage for MemoryStorage {
    fn upsert(&mut self, record: &StoredRecord) -> StorageResult<()> {
        self.upserts += 1;
        self.records.insert(record.url.clone(), record.clone());
        Ok(())
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<StoredRecord>> {
        Ok(self.records.get(url).cloned())
    }

    fn count_records(&self) -> StorageResult<u64> {
        Ok(self.records.len() as u64)
    }

    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64> {
        let id = self.runs.len() as i64 + 1;
        self.runs.push(RunRecord {
            id,
            seed: seed.to_string(),
            config_hash: config_hash.to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            status: RunStatus::Running,
            pages_stored: 0,
        });
        Ok(id)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_stored: u64,
    ) -> StorageResult<()> {
        let run = self
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;

        run.status = status;
        run.pages_stored = pages_stored;
        run.finished_at = Some(Utc::now().to_rfc3339());
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.runs
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self.runs.last().cloned())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        Ok(self.runs.len() as u64)
    }
}
