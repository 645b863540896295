//! The crawl frontier
//!
//! This module handles:
//! - The waiting sequence of URIs still to visit
//! - Deduplication: a URI is admitted at most once over the frontier's lifetime
//! - LIFO (depth-first) or FIFO (breadth-first) hand-out order
//! - In-flight accounting so a worker pool knows when the crawl is finished
//!
//! Every operation goes through one mutex, so concurrent workers discovering
//! the same link still enqueue it only once.

use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Order in which waiting URIs are handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontierOrder {
    /// Most recently added first; biases the crawl depth-first
    #[default]
    Lifo,

    /// Oldest first; breadth-first crawl
    Fifo,
}

impl fmt::Display for FrontierOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifo => write!(f, "lifo"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

/// Returned by [`Frontier::take`] when nothing is waiting
///
/// This is the normal end of a bounded crawl, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frontier is empty")]
pub struct FrontierEmpty;

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<String>,
    waiting: VecDeque<String>,
    in_flight: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<FrontierState>,
    changed: Notify,
    order: FrontierOrder,
    max_seen: Option<usize>,
}

/// Shared handle to the crawl frontier
///
/// Cloning is cheap; every clone refers to the same frontier.
#[derive(Debug, Clone)]
pub struct Frontier {
    shared: Arc<Shared>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `order` - Hand-out order for waiting URIs
    /// * `max_seen` - Cap on distinct URIs ever admitted; `None` is unbounded
    pub fn new(order: FrontierOrder, max_seen: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FrontierState::default()),
                changed: Notify::new(),
                order,
                max_seen,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // The state is only mutated in short, panic-free sections, so a
        // poisoned lock still holds consistent data.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a URI unless it has been seen before
    ///
    /// # Returns
    ///
    /// `true` if the URI was newly queued, `false` if it was already seen or
    /// the frontier cap has been reached.
    pub fn add(&self, uri: &str) -> bool {
        let queued = {
            let mut state = self.lock();

            if state.seen.contains(uri) {
                return false;
            }

            if let Some(cap) = self.shared.max_seen {
                if state.seen.len() >= cap {
                    tracing::debug!("Frontier cap of {} reached, dropping {}", cap, uri);
                    return false;
                }
            }

            state.seen.insert(uri.to_string());
            state.waiting.push_back(uri.to_string());
            state.waiting.len()
        };

        tracing::info!(
            "'{}' has been added to waiting list, waiting list has {} URIs",
            uri,
            queued
        );
        self.shared.changed.notify_waiters();
        true
    }

    /// Removes and returns the next waiting URI
    ///
    /// This does not register the URI as in flight; it is meant for a single
    /// caller stepping the crawl by hand. Worker pools use [`Frontier::next`].
    pub fn take(&self) -> Result<String, FrontierEmpty> {
        let mut state = self.lock();
        self.pop(&mut state).ok_or(FrontierEmpty)
    }

    fn pop(&self, state: &mut FrontierState) -> Option<String> {
        match self.shared.order {
            FrontierOrder::Lifo => state.waiting.pop_back(),
            FrontierOrder::Fifo => state.waiting.pop_front(),
        }
    }

    /// Waits for the next URI to work on
    ///
    /// The returned [`Claim`] keeps the URI registered as in flight until it
    /// is dropped. While nothing is waiting but other claims are still in
    /// flight this waits, since those workers may yet discover new links.
    ///
    /// # Returns
    ///
    /// * `Some(Claim)` - A URI to process
    /// * `None` - Nothing is waiting and nothing is in flight, or `cancel`
    ///   has fired
    pub async fn next(&self, cancel: &CancellationToken) -> Option<Claim> {
        loop {
            // Registered before inspecting the state so a notification sent
            // between the check and the await is not lost.
            let changed = self.shared.changed.notified();

            if cancel.is_cancelled() {
                return None;
            }

            {
                let mut state = self.lock();
                if let Some(uri) = self.pop(&mut state) {
                    state.in_flight += 1;
                    return Some(Claim {
                        uri,
                        frontier: self.clone(),
                    });
                }

                if state.in_flight == 0 {
                    drop(state);
                    // Wake any sibling still waiting so it can observe the end too
                    self.shared.changed.notify_waiters();
                    return None;
                }
            }

            tokio::select! {
                _ = changed => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    fn release(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.shared.changed.notify_waiters();
    }

    /// Returns true when no URI is waiting
    pub fn is_empty(&self) -> bool {
        self.lock().waiting.is_empty()
    }

    /// Number of URIs waiting to be taken
    pub fn len(&self) -> usize {
        self.lock().waiting.len()
    }

    /// Number of distinct URIs ever admitted
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Returns true if `uri` has ever been admitted
    pub fn has_seen(&self, uri: &str) -> bool {
        self.lock().seen.contains(uri)
    }

    /// Number of outstanding claims
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn order(&self) -> FrontierOrder {
        self.shared.order
    }
}

/// A URI handed to a worker, counted as in flight until dropped
#[derive(Debug)]
pub struct Claim {
    uri: String,
    frontier: Frontier,
}

impl Claim {
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.frontier.release();
    }
}
