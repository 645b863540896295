//! Crawl statistics
//!
//! [`CrawlStats`] is shared by every worker and updated lock-free while the
//! crawl runs; [`CrawlSummary`] is a point-in-time copy of it.
//! [`StorageStatistics`] describes what a storage backend holds.

use crate::storage::{RunRecord, Storage};
use crate::WalkerError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters for a running crawl
#[derive(Debug)]
pub struct CrawlStats {
    started: Instant,
    visited: AtomicU64,
    stored: AtomicU64,
    status_failures: AtomicU64,
    transport_failures: AtomicU64,
    storage_failures: AtomicU64,
    abandoned: AtomicU64,
    links_discovered: AtomicU64,
    links_enqueued: AtomicU64,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            visited: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            status_failures: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            storage_failures: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            links_discovered: AtomicU64::new(0),
            links_enqueued: AtomicU64::new(0),
        }
    }

    /// Records a URI taken from the frontier; returns the new visit count
    pub fn record_visit(&self) -> u64 {
        self.visited.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_failure(&self) {
        self.status_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links(&self, discovered: u64, enqueued: u64) {
        self.links_discovered.fetch_add(discovered, Ordering::Relaxed);
        self.links_enqueued.fetch_add(enqueued, Ordering::Relaxed);
    }

    /// Takes a consistent-enough copy of the counters
    pub fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            visited: self.visited.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            status_failures: self.status_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
            cancelled: false,
        }
    }
}

/// Point-in-time crawl counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    /// URIs taken from the frontier
    pub visited: u64,
    /// Documents written through the storage port
    pub stored: u64,
    /// Fetches answered with a status other than 200
    pub status_failures: u64,
    /// Fetches that failed below HTTP
    pub transport_failures: u64,
    /// Documents fetched but not persisted
    pub storage_failures: u64,
    /// Fetches cut off by shutdown
    pub abandoned: u64,
    /// Links found in fetched documents, repeats included
    pub links_discovered: u64,
    /// Links that were new to the frontier
    pub links_enqueued: u64,
    pub elapsed: Duration,
    /// Whether the crawl ended by cancellation rather than exhaustion
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.visited as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints an end-of-crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    if summary.cancelled {
        println!("Crawl was cancelled before the frontier emptied.\n");
    }
    println!("  Pages visited: {}", summary.visited);
    println!("  Pages stored: {}", summary.stored);
    println!("  Non-200 responses: {}", summary.status_failures);
    println!("  Transport errors: {}", summary.transport_failures);
    println!("  Storage errors: {}", summary.storage_failures);
    if summary.abandoned > 0 {
        println!("  Abandoned at shutdown: {}", summary.abandoned);
    }
    println!(
        "  Links found: {} ({} new)",
        summary.links_discovered, summary.links_enqueued
    );
    println!(
        "  Elapsed: {:.1}s ({:.2} pages/sec)",
        summary.elapsed.as_secs_f64(),
        summary.pages_per_second()
    );
}

/// What a storage backend currently holds
#[derive(Debug, Clone)]
pub struct StorageStatistics {
    pub total_records: u64,
    pub total_runs: u64,
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<StorageStatistics, WalkerError> {
    Ok(StorageStatistics {
        total_records: storage.count_records()?,
        total_runs: storage.count_runs()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints storage statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StorageStatistics) {
    println!("=== Crawl Statistics ===\n");
    println!("  Stored pages: {}", stats.total_records);
    println!("  Recorded runs: {}", stats.total_runs);

    if let Some(run) = &stats.latest_run {
        println!();
        println!("Latest Run (#{}):", run.id);
        println!("  Seed: {}", run.seed);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("(still running)")
        );
        println!("  Pages stored: {}", run.pages_stored);
    }
}
