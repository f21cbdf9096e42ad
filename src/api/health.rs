//! Refresh bookkeeping for the /health endpoint.
//! Updated by the feed refresher, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last successful feed fetch (0 = none).
    last_refresh_at_ns: AtomicU64,
    /// Fetches that ended in a FeedError.
    feed_failures: AtomicU64,
    /// Fetch results discarded because a newer one was already applied.
    stale_discarded: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_refreshed(&self, ns: u64) {
        self.last_refresh_at_ns.store(ns, Ordering::Relaxed);
    }

    pub fn inc_feed_failures(&self) {
        self.feed_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn feed_failures(&self) -> u64 {
        self.feed_failures.load(Ordering::Relaxed)
    }

    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded.load(Ordering::Relaxed)
    }
}
