//! [`StaleGuard`] – consecutive stale-pose detector.
//!
//! A tick whose poll exhausted the fail limit leaves the pose of record
//! unchanged.  Driving one more tick on that pose is acceptable; driving many
//! is not, because the robot keeps moving while the estimate stands still.
//! The guard counts consecutive stale ticks and trips once the count exceeds
//! the configured allowance.  Any fresh tick clears the count.
//!
//! # Example
//!
//! ```rust
//! use northstar_runtime::stale_guard::StaleGuard;
//!
//! let mut guard = StaleGuard::new(2);
//!
//! assert!(!guard.record_stale());
//! assert!(!guard.record_stale());
//! assert!(guard.record_stale()); // third in a row → give up
//!
//! guard.record_fresh();
//! assert!(!guard.record_stale());
//! ```

use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// StaleGuard
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StaleGuard {
    /// Stale ticks tolerated in a row.
    allowance: u32,
    consecutive: u32,
}

impl StaleGuard {
    /// `allowance` of 0 aborts on the first stale tick.
    pub fn new(allowance: u32) -> Self {
        Self {
            allowance,
            consecutive: 0,
        }
    }

    /// Record a tick that ran on the last committed pose.
    ///
    /// Returns `true` once more than `allowance` stale ticks have been seen in
    /// a row.
    pub fn record_stale(&mut self) -> bool {
        self.consecutive += 1;
        warn!(
            consecutive = self.consecutive,
            allowance = self.allowance,
            "continuing on stale pose"
        );
        self.is_tripped()
    }

    /// Record a tick that committed a fresh pose.
    pub fn record_fresh(&mut self) {
        self.consecutive = 0;
    }

    pub fn is_tripped(&self) -> bool {
        self.consecutive > self.allowance
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }
}
