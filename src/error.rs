//! Error taxonomy for the acquisition pipeline.

use std::time::Duration;
use thiserror::Error;

/// Failure reasons for a single page fetch.
///
/// Per-page failures are not fatal: the paginator logs them and returns
/// whatever was accumulated for the query. Only [`FetchError::Budget`]
/// propagates past the query level.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request exceeded its timeout and the timeout policy declined
    /// to retry with a larger value.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The marketplace returned 503 or served a bot-challenge page, and
    /// the attempt budget ran out while waiting it out.
    #[error("blocked by marketplace (bot challenge or 503)")]
    Blocked,

    /// A non-200, non-503 HTTP status.
    #[error("request failed with status {0}")]
    Http(u16),

    /// Connection-level failure (DNS, reset, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The session's API call budget is exhausted. Fatal for the run.
    #[error(transparent)]
    Budget(#[from] BudgetExhausted),
}

impl FetchError {
    /// Returns true if this failure ends the whole session, not just the page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Budget(_))
    }
}

/// Raised once the session's hard call cap is reached; permanent until the
/// process exits.
#[derive(Debug, Clone, Copy, Error)]
#[error("hard cap of {cap} API calls reached, stopping")]
pub struct BudgetExhausted {
    pub cap: u32,
}
