use std::sync::atomic::{AtomicU64, Ordering};

/// Optional counters for monitoring a ring buffer.
///
/// Updated with relaxed atomics; only touched when the buffer was built with
/// `Config::enable_metrics`.
#[derive(Debug, Default)]
pub struct Metrics {
    items_added: AtomicU64,
    items_removed: AtomicU64,
    add_waits: AtomicU64,
    add_failures: AtomicU64,
    clears: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_items_added(&self, n: u64) {
        self.items_added.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_items_removed(&self, n: u64) {
        self.items_removed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_add_waits(&self, n: u64) {
        self.add_waits.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_add_failures(&self, n: u64) {
        self.add_failures.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_clears(&self, n: u64) {
        self.clears.fetch_add(n, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_added: self.items_added.load(Ordering::Relaxed),
            items_removed: self.items_removed.load(Ordering::Relaxed),
            add_waits: self.add_waits.load(Ordering::Relaxed),
            add_failures: self.add_failures.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Items successfully inserted.
    pub items_added: u64,
    /// Items handed back to the reader (clears not included).
    pub items_removed: u64,
    /// Inserts that found no free slot and had to wait.
    pub add_waits: u64,
    /// Inserts abandoned after an interrupt or timeout.
    pub add_failures: u64,
    /// Calls to `clear`.
    pub clears: u64,
}

impl std::ops::AddAssign for MetricsSnapshot {
    fn add_assign(&mut self, rhs: Self) {
        self.items_added += rhs.items_added;
        self.items_removed += rhs.items_removed;
        self.add_waits += rhs.add_waits;
        self.add_failures += rhs.add_failures;
        self.clears += rhs.clears;
    }
}
