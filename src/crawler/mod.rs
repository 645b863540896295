//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of URIs waiting to be visited
//! - HTTP fetching with a strict success policy
//! - Document parsing and link extraction
//! - Overall crawl coordination across a pool of workers

mod coordinator;
mod document;
mod fetcher;
mod frontier;
mod links;

pub use coordinator::{run_crawl, Coordinator, StepOutcome, DEFAULT_CONFIG_HASH};
pub use document::Document;
pub use fetcher::{build_http_client, FetchError, Fetcher};
pub use frontier::{Claim, Frontier, FrontierEmpty, FrontierOrder};
pub use links::extract_uris;
