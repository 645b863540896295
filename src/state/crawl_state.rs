/// Crawl worker state definitions
///
/// Each worker walks the same small state machine once per URI:
/// `Idle -> FetchInFlight -> Extracting -> Persisting -> Idle`, leaving the
/// loop through `Idle -> Terminated` once the frontier is exhausted.
use std::fmt;

/// Represents where a crawl worker is within one crawl step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Waiting to take the next URI from the frontier
    Idle,

    /// A network fetch is outstanding
    FetchInFlight,

    /// Discovered links are being fed back into the frontier
    Extracting,

    /// The document is being written through the storage port
    Persisting,

    /// The frontier is exhausted (or the crawl was cancelled)
    Terminated,
}

impl CrawlState {
    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `FetchInFlight -> Idle` covers every fetch failure: a failed fetch
    /// extracts nothing and persists nothing.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        use CrawlState::*;
        matches!(
            (self, next),
            (Idle, FetchInFlight)
                | (Idle, Terminated)
                | (FetchInFlight, Extracting)
                | (FetchInFlight, Idle)
                | (Extracting, Persisting)
                | (Persisting, Idle)
        )
    }

    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchInFlight => "fetch_in_flight",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Terminated => "terminated",
        }
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::FetchInFlight,
            Self::Extracting,
            Self::Persisting,
            Self::Terminated,
        ]
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
