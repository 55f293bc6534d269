use netscope_coalesced::CoalescingCache;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Debug)]
/// Successful root response
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
}

/// Whether a response was served from the cache
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` header
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Value along with where it came from
#[derive(Debug)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

#[derive(Serialize, ToSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Counters for a single cache.
pub struct CacheSummary {
    /// Entries held, including expired ones not yet evicted
    pub entries: usize,
    /// Upstream calls currently running
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    /// Upstream calls made through the cache
    pub producer_runs: u64,
    /// Requests that shared an upstream call already running
    pub joined: u64,
}

impl CacheSummary {
    pub fn new<V, E>(cache: &CoalescingCache<V, E>) -> Self
    where
        V: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let stats = cache.stats();

        Self {
            entries: cache.len(),
            in_flight: cache.in_flight_count(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            producer_runs: stats.producer_runs,
            joined: stats.joined,
        }
    }
}

#[derive(Serialize, ToSchema, Clone, Debug)]
/// Cache counters for every upstream operation.
pub struct CacheReport {
    /// Measurement creation
    pub checks: CacheSummary,
    /// Measurement polling
    pub results: CacheSummary,
}
