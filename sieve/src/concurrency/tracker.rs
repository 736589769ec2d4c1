//! Accounting of the concurrent units spawned by a pipeline.
//!
//! Each spawned unit holds a [`UnitGuard`] for as long as its task runs. The guard is released
//! when the task completes or unwinds, so the counters reflect units that are actually alive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};

use crate::metrics::{SIEVE_LIVE_STAGES, SIEVE_STAGES_SPAWNED_TOTAL};

/// Kind of unit tracked by a [`UnitGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Generator,
    Stage,
}

#[derive(Debug, Default)]
struct UnitTrackerInner {
    live_generators: AtomicUsize,
    live_stages: AtomicUsize,
    peak_live_stages: AtomicUsize,
    stages_spawned: AtomicUsize,
}

/// Point-in-time view of a [`UnitTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitTrackerSnapshot {
    /// Source generators currently alive.
    pub live_generators: usize,
    /// Filter stages currently alive.
    pub live_stages: usize,
    /// Highest number of filter stages alive at the same time.
    pub peak_live_stages: usize,
    /// Filter stages spawned since the tracker was created.
    pub stages_spawned: usize,
}

impl UnitTrackerSnapshot {
    /// Returns the number of units currently alive.
    pub fn live_units(&self) -> usize {
        self.live_generators + self.live_stages
    }
}

/// Shared counters of live and spawned pipeline units.
#[derive(Debug, Clone, Default)]
pub struct UnitTracker {
    inner: Arc<UnitTrackerInner>,
}

impl UnitTracker {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new filter stage, returning the guard its task must hold.
    pub fn track_stage(&self) -> UnitGuard {
        let live = self.inner.live_stages.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_live_stages.fetch_max(live, Ordering::SeqCst);
        self.inner.stages_spawned.fetch_add(1, Ordering::SeqCst);

        counter!(SIEVE_STAGES_SPAWNED_TOTAL).increment(1);
        gauge!(SIEVE_LIVE_STAGES).increment(1.0);

        UnitGuard {
            inner: self.inner.clone(),
            kind: UnitKind::Stage,
        }
    }

    /// Registers a new source generator, returning the guard its task must hold.
    pub fn track_generator(&self) -> UnitGuard {
        self.inner.live_generators.fetch_add(1, Ordering::SeqCst);

        UnitGuard {
            inner: self.inner.clone(),
            kind: UnitKind::Generator,
        }
    }

    /// Returns the number of units currently alive.
    pub fn live_units(&self) -> usize {
        self.snapshot().live_units()
    }

    /// Returns the current values of all counters.
    pub fn snapshot(&self) -> UnitTrackerSnapshot {
        UnitTrackerSnapshot {
            live_generators: self.inner.live_generators.load(Ordering::SeqCst),
            live_stages: self.inner.live_stages.load(Ordering::SeqCst),
            peak_live_stages: self.inner.peak_live_stages.load(Ordering::SeqCst),
            stages_spawned: self.inner.stages_spawned.load(Ordering::SeqCst),
        }
    }
}

/// Marks a unit as alive until dropped.
#[derive(Debug)]
pub struct UnitGuard {
    inner: Arc<UnitTrackerInner>,
    kind: UnitKind,
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        match self.kind {
            UnitKind::Generator => {
                self.inner.live_generators.fetch_sub(1, Ordering::SeqCst);
            }
            UnitKind::Stage => {
                self.inner.live_stages.fetch_sub(1, Ordering::SeqCst);
                gauge!(SIEVE_LIVE_STAGES).decrement(1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_release_live_units_on_drop() {
        let tracker = UnitTracker::new();

        let generator = tracker.track_generator();
        let first = tracker.track_stage();
        let second = tracker.track_stage();
        assert_eq!(tracker.live_units(), 3);

        drop(second);
        drop(first);
        let third = tracker.track_stage();
        drop(generator);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.live_generators, 0);
        assert_eq!(snapshot.live_stages, 1);
        assert_eq!(snapshot.peak_live_stages, 2);
        assert_eq!(snapshot.stages_spawned, 3);

        drop(third);
        assert_eq!(tracker.live_units(), 0);
    }

    #[test]
    fn clones_share_counters() {
        let tracker = UnitTracker::new();
        let clone = tracker.clone();

        let _guard = clone.track_stage();

        assert_eq!(tracker.snapshot().stages_spawned, 1);
    }
}
