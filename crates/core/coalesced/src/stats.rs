use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters for a [`crate::CoalescingCache`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CacheStats {
    /// `get` calls that returned a value
    pub hits: u64,
    /// `get` calls that returned nothing, expired entries included
    pub misses: u64,
    /// Entries removed by `get` because they had expired
    pub expired: u64,
    /// Producers actually invoked by `coalesce`
    pub producer_runs: u64,
    /// `coalesce` calls that joined an invocation already in flight
    pub joined: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    producer_runs: AtomicU64,
    joined: AtomicU64,
}

impl Counters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn producer_run(&self) {
        self.producer_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn joined(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            producer_runs: self.producer_runs.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
        }
    }
}
