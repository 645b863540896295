use crate::crawler::FrontierOrder;
use serde::Deserialize;

/// Seed used when neither the command line nor the config names one
pub const DEFAULT_SEED: &str = "https://pondof.fish";

/// Main configuration structure for Walker
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URI the crawl starts from
    pub seed: String,

    /// Number of concurrent crawl workers
    pub workers: u32,

    /// Order in which the frontier hands out URIs
    pub frontier_order: FrontierOrder,

    /// Upper bound on URIs ever admitted to the frontier (unbounded when absent)
    pub max_frontier: Option<usize>,

    /// Whole-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// How long an in-flight fetch may keep running after cancellation (milliseconds)
    pub shutdown_grace_ms: u64,

    /// Emit a progress line every N visited pages
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            workers: 1,
            frontier_order: FrontierOrder::default(),
            max_frontier: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            shutdown_grace_ms: 5_000,
            progress_interval: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Walker".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./walker.db".to_string(),
        }
    }
}
