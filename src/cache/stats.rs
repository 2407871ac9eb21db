//! Cache Statistics Module
//!
//! Tracks cache performance metrics: hits, misses and writes.

use serde::Serialize;

// == Cache Stats ==
/// Monotonic counters for one store. Only `reset` brings them back to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of writes
    pub sets: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups (hits + misses).
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Set ==
    /// Increments the write counter.
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    // == Reset ==
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Snapshot ==
    /// Builds the externally reported view of these counters.
    ///
    /// `size` is the raw entry count of the store, stale entries included.
    pub fn snapshot(&self, size: usize) -> StatsSnapshot {
        let total = self.lookups();
        let hit_rate = if total == 0 {
            "0%".to_string()
        } else {
            format!("{:.2}%", self.hit_rate() * 100.0)
        };

        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            size,
            hit_rate,
            total,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time statistics as reported by `TtlStore::stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Raw entry count, may include expired entries not yet swept
    pub size: usize,
    /// Percentage with two decimals, e.g. `"66.67%"`, or `"0%"` before any lookup
    pub hit_rate: String,
    /// hits + misses
    pub total: u64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.sets, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.snapshot(0).hit_rate, "0%");
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.snapshot(0).hit_rate, "100.00%");
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snapshot = stats.snapshot(2);
        assert_eq!(snapshot.hit_rate, "66.67%");
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.size, 2);
    }

    #[test]
    fn test_reset() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_set();
        stats.reset();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut stats = CacheStats::new();
        stats.record_set();
        stats.record_hit();

        let json = serde_json::to_value(stats.snapshot(1)).unwrap();
        assert_eq!(json["hitRate"], "100.00%");
        assert_eq!(json["sets"], 1);
        assert_eq!(json["total"], 1);
    }
}
