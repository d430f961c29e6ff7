use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a resolver over its whole lifetime, across every
/// call to `resolve`.  The resolver updates these as it goes; take a
/// `summary` to read them.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Lookups answered entirely from the cache.
    cache_hits: AtomicU64,
    /// Lookups which had to go to the network.
    cache_misses: AtomicU64,
    /// Queries sent upstream, including retries.
    live_queries: AtomicU64,
    /// Queries sent again after an indeterminate failure.
    retries: AtomicU64,
    /// Lookups which gave up after exhausting their retries.
    failed_queries: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn live_query(&self) {
        self.live_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_query(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            live_queries: self.live_queries.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of `Metrics`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct MetricsSummary {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub live_queries: u64,
    pub retries: u64,
    pub failed_queries: u64,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "cache_hits={} cache_misses={} live_queries={} retries={} failed_queries={}",
            self.cache_hits, self.cache_misses, self.live_queries, self.retries, self.failed_queries
        )
    }
}
