//! Walker main entry point
//!
//! This is the command-line interface for the Walker web crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use walker::config::{load_config_with_hash, validate, Config};
use walker::crawler::{Coordinator, DEFAULT_CONFIG_HASH};
use walker::output::{load_statistics, print_statistics, print_summary};
use walker::storage::SqliteStorage;

/// Walker: a small, sturdy web crawler
///
/// Walker starts from a seed address, follows every link it finds and stores
/// the title, text and raw source of each page it can fetch.
#[derive(Parser, Debug)]
#[command(name = "walker")]
#[command(version)]
#[command(about = "A small, sturdy web crawler", long_about = None)]
struct Cli {
    /// Address to start crawling from (overrides the config file)
    #[arg(value_name = "SEED")]
    seed: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of concurrent crawl workers (overrides the config file)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    (cfg, hash)
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => (Config::default(), DEFAULT_CONFIG_HASH.to_string()),
    };

    if let Some(seed) = cli.seed {
        config.crawler.seed = seed;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    validate(&config)?;

    if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("walker=info,warn"),
                1 => EnvFilter::new("walker=debug,info"),
                2 => EnvFilter::new("walker=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling from {} with {} worker(s), writing to {}",
        config.crawler.seed,
        config.crawler.workers,
        config.output.database_path
    );

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight requests");
            signal_token.cancel();
        }
    });

    let mut coordinator = Coordinator::new(config, storage)?
        .with_config_hash(config_hash)
        .with_cancellation(cancel);

    match coordinator.run().await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
