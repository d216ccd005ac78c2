use std::sync::atomic::{AtomicU64, Ordering};

/// Epoch
///
/// Generation token captured at the start of an in-flight operation. A result
/// whose epoch no longer matches the clock belongs to a navigation the user
/// has already left and must be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// EpochClock
///
/// Monotonic counter owned by the application shell and advanced once per
/// navigation. The guard and the cache coordinator each hold a handle and
/// compare captured epochs against it at their completion points.
#[derive(Debug, Default)]
pub struct EpochClock {
    current: AtomicU64,
}

impl EpochClock {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// The epoch of the navigation currently in progress.
    pub fn current(&self) -> Epoch {
        Epoch(self.current.load(Ordering::Acquire))
    }

    /// Start a new navigation, invalidating every previously captured epoch.
    pub fn advance(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}
