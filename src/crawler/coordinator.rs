//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the other parts together:
//! - Taking URIs from the frontier
//! - Fetching and parsing documents
//! - Feeding discovered links back into the frontier
//! - Persisting documents through the storage port
//! - Running a pool of workers until the frontier is exhausted or cancelled
//!
//! No single page can stop a crawl. Fetch errors and storage errors are
//! logged, counted and skipped; a URI that failed is never queued again.

use crate::config::Config;
use crate::crawler::document::Document;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEmpty};
use crate::output::{CrawlStats, CrawlSummary};
use crate::state::{CrawlState, StateMachine};
use crate::storage::{RunStatus, Storage, StorageError};
use crate::WalkerError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Config hash recorded for runs whose settings did not come from a file
pub const DEFAULT_CONFIG_HASH: &str = "default";

/// What happened to one URI
#[derive(Debug)]
pub enum StepOutcome {
    /// The document was fetched, its links queued and the record stored
    Stored {
        uri: String,
        /// Links found in the raw source, repeats included
        discovered: usize,
        /// Links that were new to the frontier
        enqueued: usize,
    },

    /// The fetch failed; nothing was extracted or stored
    Skipped { uri: String, error: FetchError },

    /// Links were queued but the record could not be written
    PersistFailed { uri: String, error: StorageError },

    /// Shutdown cut the fetch off after its grace period
    Abandoned { uri: String },

    /// The frontier is empty (or the crawl was cancelled)
    Terminated,
}

impl StepOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Everything a worker needs to process one URI
struct Pipeline<S> {
    frontier: Frontier,
    fetcher: Fetcher,
    storage: Arc<Mutex<S>>,
    stats: Arc<CrawlStats>,
    shutdown_grace: Duration,
    progress_interval: u64,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            frontier: self.frontier.clone(),
            fetcher: self.fetcher.clone(),
            storage: Arc::clone(&self.storage),
            stats: Arc::clone(&self.stats),
            shutdown_grace: self.shutdown_grace,
            progress_interval: self.progress_interval,
        }
    }
}

fn advance(machine: &mut StateMachine, next: CrawlState) {
    if let Err(e) = machine.transition(next) {
        tracing::error!("{}", e);
    }
}

impl<S: Storage + 'static> Pipeline<S> {
    /// Worker loop: claim, process, release, until the frontier reports done
    async fn work(self, worker: usize, cancel: CancellationToken) {
        let mut machine = StateMachine::new();
        tracing::debug!("Worker {} started", worker);

        while let Some(claim) = self.frontier.next(&cancel).await {
            self.process(claim.uri(), &mut machine, &cancel).await;
            // Releasing the claim only now means its discovered links are
            // already queued when the frontier checks for completion.
            drop(claim);
        }

        advance(&mut machine, CrawlState::Terminated);
        tracing::debug!("Worker {} finished", worker);
    }

    /// Runs one URI through fetch, extraction and persistence
    async fn process(
        &self,
        uri: &str,
        machine: &mut StateMachine,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let visits = self.stats.record_visit();
        advance(machine, CrawlState::FetchInFlight);
        tracing::info!("Get {}", uri);

        let fetched = match self.fetch_with_grace(uri, cancel).await {
            Some(fetched) => fetched,
            None => {
                self.stats.record_abandoned();
                advance(machine, CrawlState::Idle);
                return StepOutcome::Abandoned {
                    uri: uri.to_string(),
                };
            }
        };

        let document = match fetched {
            Ok(document) => document,
            Err(error) => {
                if error.is_transport() {
                    self.stats.record_transport_failure();
                } else {
                    self.stats.record_status_failure();
                }
                advance(machine, CrawlState::Idle);
                self.report_progress(visits);
                return StepOutcome::Skipped {
                    uri: uri.to_string(),
                    error,
                };
            }
        };

        advance(machine, CrawlState::Extracting);
        let (discovered, enqueued) = self.enqueue_links(&document);

        advance(machine, CrawlState::Persisting);
        let outcome = match self.persist(&document) {
            Ok(()) => {
                self.stats.record_stored();
                StepOutcome::Stored {
                    uri: uri.to_string(),
                    discovered,
                    enqueued,
                }
            }
            Err(error) => {
                tracing::error!("Failed to store {}: {}", document.origin(), error);
                self.stats.record_storage_failure();
                StepOutcome::PersistFailed {
                    uri: uri.to_string(),
                    error,
                }
            }
        };

        advance(machine, CrawlState::Idle);
        self.report_progress(visits);
        outcome
    }

    /// Fetches `uri`, letting an in-flight request finish within the grace
    /// period once shutdown has been requested
    ///
    /// Returns `None` if the request was cut off.
    async fn fetch_with_grace(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Option<Result<Document, FetchError>> {
        let fetch = self.fetcher.fetch(uri);
        tokio::pin!(fetch);

        tokio::select! {
            result = &mut fetch => Some(result),
            _ = cancel.cancelled() => {
                tracing::info!(
                    "Shutdown requested, giving {} up to {:?} to finish",
                    uri,
                    self.shutdown_grace
                );
                match tokio::time::timeout(self.shutdown_grace, &mut fetch).await {
                    Ok(result) => Some(result),
                    Err(_) => {
                        tracing::warn!("Abandoned fetch of {} at shutdown", uri);
                        None
                    }
                }
            }
        }
    }

    fn enqueue_links(&self, document: &Document) -> (usize, usize) {
        let mut discovered = 0;
        let mut enqueued = 0;

        for link in document.uris() {
            discovered += 1;
            tracing::trace!("Got {} from {}", link, document.origin());
            if self.frontier.add(&link) {
                enqueued += 1;
            }
        }

        self.stats.record_links(discovered as u64, enqueued as u64);
        tracing::debug!(
            "{}: {} links found, {} new, {} waiting",
            document.origin(),
            discovered,
            enqueued,
            self.frontier.len()
        );
        (discovered, enqueued)
    }

    fn persist(&self, document: &Document) -> Result<(), StorageError> {
        let record = document.to_record();
        self.lock_storage().upsert(&record)
    }

    /// Locks the storage backend, recovering it if a worker panicked mid-write
    ///
    /// A poisoned lock must not keep the run record from being finished.
    fn lock_storage(&self) -> MutexGuard<'_, S> {
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn report_progress(&self, visits: u64) {
        if visits % self.progress_interval != 0 {
            return;
        }

        let summary = self.stats.snapshot();
        tracing::info!(
            "Progress: {} pages visited, {} stored, {} in frontier, {:.2} pages/sec",
            summary.visited,
            summary.stored,
            self.frontier.len(),
            summary.pages_per_second()
        );
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<S> {
    pipeline: Pipeline<S>,
    seed: String,
    workers: usize,
    config_hash: String,
    cancel: CancellationToken,
    state: StateMachine,
}

impl<S: Storage + 'static> Coordinator<S> {
    /// Creates a coordinator and seeds its frontier
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Where fetched documents are written
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to step or run
    /// * `Err(WalkerError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: S) -> Result<Self, WalkerError> {
        let fetcher = Fetcher::new(&config)?;
        let frontier = Frontier::new(config.crawler.frontier_order, config.crawler.max_frontier);

        tracing::info!("Seeding frontier with {}", config.crawler.seed);
        frontier.add(&config.crawler.seed);

        Ok(Self {
            pipeline: Pipeline {
                frontier,
                fetcher,
                storage: Arc::new(Mutex::new(storage)),
                stats: Arc::new(CrawlStats::new()),
                shutdown_grace: Duration::from_millis(config.crawler.shutdown_grace_ms),
                progress_interval: config.crawler.progress_interval.max(1),
            },
            seed: config.crawler.seed,
            workers: config.crawler.workers.max(1) as usize,
            config_hash: DEFAULT_CONFIG_HASH.to_string(),
            cancel: CancellationToken::new(),
            state: StateMachine::new(),
        })
    }

    /// Records `hash` with the crawl run instead of the default marker
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Uses an externally owned token for shutdown
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn frontier(&self) -> &Frontier {
        &self.pipeline.frontier
    }

    /// Shared handle to the storage backend
    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.pipeline.storage)
    }

    /// Current crawl counters
    pub fn stats(&self) -> CrawlSummary {
        self.pipeline.stats.snapshot()
    }

    /// Token that stops the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Performs one crawl step on the calling task
    ///
    /// Takes one URI from the frontier and runs it through fetch, extraction
    /// and persistence. Returns [`StepOutcome::Terminated`] once the frontier
    /// is empty or the crawl has been cancelled, and on every call after that.
    pub async fn step(&mut self) -> StepOutcome {
        if self.state.current().is_terminal() {
            return StepOutcome::Terminated;
        }

        if self.cancel.is_cancelled() {
            tracing::info!("Crawl cancelled");
            advance(&mut self.state, CrawlState::Terminated);
            return StepOutcome::Terminated;
        }

        match self.pipeline.frontier.take() {
            Ok(uri) => {
                self.pipeline
                    .process(&uri, &mut self.state, &self.cancel)
                    .await
            }
            Err(FrontierEmpty) => {
                tracing::info!("Frontier is empty, crawl complete");
                advance(&mut self.state, CrawlState::Terminated);
                StepOutcome::Terminated
            }
        }
    }

    /// Runs the crawl to completion with the configured number of workers
    ///
    /// This method:
    /// 1. Records a new run in storage
    /// 2. Spawns the workers, each looping on the shared frontier
    /// 3. Waits until the frontier is empty with nothing in flight, or the
    ///    cancellation token fires
    /// 4. Marks the run completed, cancelled or failed
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Final counters
    /// * `Err(WalkerError)` - Run bookkeeping failed or a worker panicked
    pub async fn run(&mut self) -> Result<CrawlSummary, WalkerError> {
        let run_id = self
            .pipeline
            .lock_storage()
            .create_run(&self.seed, &self.config_hash)?;

        tracing::info!(
            "Starting crawl run {} from {} with {} worker(s), {} frontier",
            run_id,
            self.seed,
            self.workers,
            self.pipeline.frontier.order()
        );

        let mut workers = JoinSet::new();
        for worker in 0..self.workers {
            let pipeline = self.pipeline.clone();
            let cancel = self.cancel.clone();
            workers.spawn(pipeline.work(worker, cancel));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker failed: {}", e);
                failure.get_or_insert(e);
            }
        }

        let mut summary = self.pipeline.stats.snapshot();
        summary.cancelled = self.cancel.is_cancelled();

        let status = if failure.is_some() {
            RunStatus::Failed
        } else if summary.cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        self.pipeline
            .lock_storage()
            .finish_run(run_id, status, summary.stored)?;

        if let Some(e) = failure {
            return Err(e.into());
        }

        tracing::info!(
            "Crawl run {} {}: {} pages visited, {} stored in {:?}",
            run_id,
            status.to_db_string(),
            summary.visited,
            summary.stored,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Runs a complete crawl
///
/// # Example
///
/// ```no_run
/// use walker::config::Config;
/// use walker::crawler::run_crawl;
/// use walker::storage::SqliteStorage;
/// use tokio_util::sync::CancellationToken;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = SqliteStorage::new(Path::new("walker.db"))?;
/// let summary = run_crawl(Config::default(), storage, CancellationToken::new()).await?;
/// println!("Stored {} pages", summary.stored);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<S: Storage + 'static>(
    config: Config,
    storage: S,
    cancel: CancellationToken,
) -> Result<CrawlSummary, WalkerError> {
    let mut coordinator = Coordinator::new(config, storage)?.with_cancellation(cancel);
    coordinator.run().await
}
