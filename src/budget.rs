//! Session-scoped guard for metered API calls.

use crate::error::BudgetExhausted;
use tracing::warn;

/// Hard ceiling on Finding API calls per session.
pub const DEFAULT_CALL_CAP: u32 = 4750;

/// Usage levels at which a one-time warning is logged.
pub const DEFAULT_WARN_THRESHOLDS: [u32; 3] = [2500, 3500, 4000];

/// Tracks calls made against a hard cap, warning as usage climbs.
///
/// One instance per scrape session, created at session start and never
/// reset. Once the cap is reached every further [`charge`](Self::charge)
/// fails, permanently.
#[derive(Debug)]
pub struct CallBudget {
    used: u32,
    cap: u32,
    thresholds: Vec<u32>,
    next_warning: usize,
}

impl CallBudget {
    /// Creates a budget with the production cap and warning thresholds.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CALL_CAP, &DEFAULT_WARN_THRESHOLDS)
    }

    /// Creates a budget with explicit limits. Thresholds must be ascending
    /// and below the cap; anything at or above the cap never fires.
    pub fn with_limits(cap: u32, thresholds: &[u32]) -> Self {
        let mut thresholds: Vec<u32> = thresholds.iter().copied().filter(|&t| t < cap).collect();
        thresholds.sort_unstable();
        Self { used: 0, cap, thresholds, next_warning: 0 }
    }

    /// Records one remote call. Fails without incrementing once the cap
    /// would be exceeded.
    pub fn charge(&mut self) -> Result<(), BudgetExhausted> {
        if self.used >= self.cap {
            return Err(BudgetExhausted { cap: self.cap });
        }
        self.used += 1;

        while self.next_warning < self.thresholds.len()
            && self.used >= self.thresholds[self.next_warning]
        {
            warn!(calls = self.used, cap = self.cap, "API call usage threshold crossed");
            self.next_warning += 1;
        }

        Ok(())
    }

    /// Calls charged so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Remaining calls before the cap.
    pub fn remaining(&self) -> u32 {
        self.cap - self.used
    }

    /// True once the cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.cap
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new()
    }
}
