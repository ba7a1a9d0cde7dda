//! Geolocation lookup statistics.
//!
//! Thread-safe counters for cache behaviour and provider failures, shared
//! across concurrent lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ProviderFailureKind;

/// Thread-safe lookup statistics tracker.
///
/// All failure kinds are initialized to zero on creation so increments never
/// need to insert.
pub struct LookupStats {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    unresolved: AtomicUsize,
    failures: HashMap<ProviderFailureKind, AtomicUsize>,
}

impl LookupStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for kind in ProviderFailureKind::iter() {
            failures.insert(kind, AtomicUsize::new(0));
        }

        LookupStats {
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            unresolved: AtomicUsize::new(0),
            failures,
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup where every provider failed.
    pub fn record_unresolved(&self) {
        self.unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failure(&self, kind: ProviderFailureKind) {
        if let Some(counter) = self.failures.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                kind
            );
        }
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::SeqCst)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::SeqCst)
    }

    pub fn unresolved(&self) -> usize {
        self.unresolved.load(Ordering::SeqCst)
    }

    /// Returns 0 for a kind that is not tracked.
    pub fn get_failure_count(&self, kind: ProviderFailureKind) -> usize {
        self.failures
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_failures(&self) -> usize {
        self.failures
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }
}

impl Default for LookupStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a summary of lookup statistics at `info` level.
pub fn log_lookup_statistics(stats: &LookupStats) {
    log::info!(
        "Geolocation: {} cache hits, {} cache misses, {} unresolved",
        stats.cache_hits(),
        stats.cache_misses(),
        stats.unresolved()
    );
    for kind in ProviderFailureKind::iter() {
        let count = stats.get_failure_count(kind);
        if count > 0 {
            log::info!("   {}: {}", kind, count);
        }
    }
}
