//! Statistics tracking for arenas

use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::utils::atomic_max;

/// Atomic counters tracking arena usage
///
/// All counters are updated with relaxed ordering; cross-thread visibility
/// of a consistent set of values is provided by the arena lock.
#[derive(Debug)]
pub struct ArenaStats {
    live_allocations: AtomicU64,
    total_allocations: AtomicU64,
    bytes_allocated: AtomicU64,
    peak_usage: AtomicUsize,
    failed_allocations: AtomicU64,
}

impl ArenaStats {
    /// Creates a new zeroed stats object
    #[must_use]
    pub const fn new() -> Self {
        Self {
            live_allocations: AtomicU64::new(0),
            total_allocations: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            peak_usage: AtomicUsize::new(0),
            failed_allocations: AtomicU64::new(0),
        }
    }

    // Getters

    /// Allocations that have not been released by a rollback or reset
    pub fn live_allocations(&self) -> u64 {
        self.live_allocations.load(Ordering::Relaxed)
    }

    /// Cumulative number of successful allocations
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations.load(Ordering::Relaxed)
    }

    /// Cumulative requested bytes handed out successfully
    ///
    /// Counts requested sizes, not aligned sizes; alignment padding is
    /// excluded.
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    /// Highest offset ever observed
    pub fn peak_usage(&self) -> usize {
        self.peak_usage.load(Ordering::Relaxed)
    }

    /// Number of allocation attempts that failed for lack of capacity
    pub fn failed_allocations(&self) -> u64 {
        self.failed_allocations.load(Ordering::Relaxed)
    }

    /// Reset all counters except `peak_usage`
    ///
    /// The peak survives resets so it keeps describing the high-water mark
    /// over the arena's whole lifetime.
    pub fn reset(&self) {
        self.live_allocations.store(0, Ordering::Relaxed);
        self.total_allocations.store(0, Ordering::Relaxed);
        self.bytes_allocated.store(0, Ordering::Relaxed);
        self.failed_allocations.store(0, Ordering::Relaxed);
    }

    // Internal update methods

    pub(crate) fn record_allocation(&self, bytes: usize) {
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_extend(&self, bytes: usize) {
        self.bytes_allocated
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Restore the live-allocation count to a value captured at a marker
    pub(crate) fn restore_live(&self, live: u64) {
        self.live_allocations.store(live, Ordering::Relaxed);
    }

    /// Release every live allocation at once (reset, destroy)
    pub(crate) fn release_all(&self) {
        self.live_allocations.store(0, Ordering::Relaxed);
    }

    pub(crate) fn update_peak(&self, offset: usize) {
        atomic_max(&self.peak_usage, offset);
    }

    /// Creates a snapshot of current statistics
    pub fn snapshot(&self) -> ArenaStatsSnapshot {
        ArenaStatsSnapshot {
            live_allocations: self.live_allocations(),
            total_allocations: self.total_allocations(),
            bytes_allocated: self.bytes_allocated(),
            peak_usage: self.peak_usage(),
            failed_allocations: self.failed_allocations(),
        }
    }
}

impl Default for ArenaStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of arena statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStatsSnapshot {
    pub live_allocations: u64,
    pub total_allocations: u64,
    pub bytes_allocated: u64,
    pub peak_usage: usize,
    pub failed_allocations: u64,
}

impl fmt::Display for ArenaStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arena Statistics:")?;
        writeln!(f, "  Live allocations: {}", self.live_allocations)?;
        writeln!(f, "  Total allocations: {}", self.total_allocations)?;
        writeln!(f, "  Bytes allocated: {}", self.bytes_allocated)?;
        writeln!(f, "  Peak usage: {} bytes", self.peak_usage)?;
        writeln!(f, "  Failed allocations: {}", self.failed_allocations)?;
        Ok(())
    }
}
