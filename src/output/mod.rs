//! Output module for crawl progress and statistics
//!
//! This module handles:
//! - Live counters updated by crawl workers
//! - The end-of-crawl summary
//! - Statistics read back from a storage backend

pub mod stats;

pub use stats::{
    load_statistics, print_statistics, print_summary, CrawlStats, CrawlSummary,
    StorageStatistics,
};
