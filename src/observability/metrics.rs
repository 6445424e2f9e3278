//! Operational counters
//!
//! Counters only, monotonic, reset on process start. Relaxed ordering:
//! metrics tolerate eventual consistency.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter registry for the publishing core
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Collections created
    collections_created: AtomicU64,
    /// Versions committed
    versions_published: AtomicU64,
    /// Publish attempts rejected before commit
    publishes_rejected: AtomicU64,
    /// Outbox events appended
    outbox_appends: AtomicU64,
    /// Index upserts applied
    index_upserts: AtomicU64,
    /// Index deletes applied
    index_deletes: AtomicU64,
    /// Index apply attempts that failed
    index_failures: AtomicU64,
    /// Searches answered in degraded mode
    degraded_searches: AtomicU64,
    /// Full reindex runs
    reindex_runs: AtomicU64,
    /// Subscriptions created
    subscriptions_created: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a collection creation
    pub fn incr_collections_created(&self) {
        self.collections_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed publish
    pub fn incr_versions_published(&self) {
        self.versions_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected publish
    pub fn incr_publishes_rejected(&self) {
        self.publishes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an outbox append
    pub fn incr_outbox_appends(&self) {
        self.outbox_appends.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an index upsert
    pub fn incr_index_upserts(&self) {
        self.index_upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an index delete
    pub fn incr_index_deletes(&self) {
        self.index_deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed index apply attempt
    pub fn incr_index_failures(&self) {
        self.index_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a degraded-mode search
    pub fn incr_degraded_searches(&self) {
        self.degraded_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a full reindex run
    pub fn incr_reindex_runs(&self) {
        self.reindex_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscription creation
    pub fn incr_subscriptions_created(&self) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Current collections-created count
    pub fn collections_created(&self) -> u64 {
        self.collections_created.load(Ordering::Relaxed)
    }

    /// Current versions-published count
    pub fn versions_published(&self) -> u64 {
        self.versions_published.load(Ordering::Relaxed)
    }

    /// Current rejected-publish count
    pub fn publishes_rejected(&self) -> u64 {
        self.publishes_rejected.load(Ordering::Relaxed)
    }

    /// Current outbox-append count
    pub fn outbox_appends(&self) -> u64 {
        self.outbox_appends.load(Ordering::Relaxed)
    }

    /// Current index-upsert count
    pub fn index_upserts(&self) -> u64 {
        self.index_upserts.load(Ordering::Relaxed)
    }

    /// Current index-delete count
    pub fn index_deletes(&self) -> u64 {
        self.index_deletes.load(Ordering::Relaxed)
    }

    /// Current index-failure count
    pub fn index_failures(&self) -> u64 {
        self.index_failures.load(Ordering::Relaxed)
    }

    /// Current degraded-search count
    pub fn degraded_searches(&self) -> u64 {
        self.degraded_searches.load(Ordering::Relaxed)
    }

    /// Current reindex-run count
    pub fn reindex_runs(&self) -> u64 {
        self.reindex_runs.load(Ordering::Relaxed)
    }

    /// Current subscriptions-created count
    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let m = MetricsRegistry::new();
        assert_eq!(m.versions_published(), 0);
        assert_eq!(m.index_failures(), 0);
    }

    #[test]
    fn test_counters_increment() {
        let m = MetricsRegistry::new();
        m.incr_versions_published();
        m.incr_versions_published();
        m.incr_degraded_searches();
        assert_eq!(m.versions_published(), 2);
        assert_eq!(m.degraded_searches(), 1);
    }
}
