//! Configuration module for Walker
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; missing values fall back to defaults, so an
//! empty file (or no file at all) yields a crawl of `https://pondof.fish` with a
//! single worker writing to `./walker.db`.
//!
//! # Example
//!
//! ```no_run
//! use walker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("walker.toml")).unwrap();
//! println!("Crawl will start from: {}", config.crawler.seed);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_SEED};

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash, parse_config};
pub use validation::validate;
