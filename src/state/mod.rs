//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: where a worker is within one fetch/extract/persist step
//! - `StateMachine`: a checked holder that rejects illegal transitions

mod crawl_state;

pub use crawl_state::CrawlState;

use crate::WalkerError;

/// Tracks one worker's current state and validates every transition
#[derive(Debug, Default)]
pub struct StateMachine {
    current: CrawlState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state
    pub fn current(&self) -> CrawlState {
        self.current
    }

    /// Moves to `next`, failing if the transition is not part of the crawl cycle
    pub fn transition(&mut self, next: CrawlState) -> Result<(), WalkerError> {
        if !self.current.can_transition_to(next) {
            return Err(WalkerError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        tracing::trace!("State {} -> {}", self.current, next);
        self.current = next;
        Ok(())
    }
}
