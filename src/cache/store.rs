//! Cache Store Module
//!
//! Generic key-value store with per-entry TTL, lazy expiration on read and an
//! explicit sweep for entries nobody reads again.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, StatsSnapshot, SystemClock};
use crate::error::{CacheError, Result};

// == TTL Store ==
/// In-memory store with TTL expiration and hit/miss accounting.
///
/// Not internally synchronised; share it as `Arc<RwLock<TtlStore<V>>>`.
/// Lookups mutate statistics, so they need the write half of the lock.
#[derive(Debug)]
pub struct TtlStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL in milliseconds for writes without an explicit TTL
    default_ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlStore<V> {
    // == Constructor ==
    /// Creates a store reading the system clock.
    ///
    /// # Errors
    /// `InvalidConfig` if `default_ttl_ms` is zero.
    pub fn new(default_ttl_ms: u64) -> Result<Self> {
        Self::with_clock(default_ttl_ms, Arc::new(SystemClock))
    }

    /// Creates a store reading time from `clock`.
    pub fn with_clock(default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if default_ttl_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "default TTL must be a positive number of milliseconds".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl_ms,
            clock,
        })
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on the spot and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                None
            }
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.stats.record_miss();
                debug!("Cache entry '{}' expired on read", key);
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its TTL.
    ///
    /// # Arguments
    /// * `ttl_ms` - TTL in milliseconds, `None` uses the store default
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl_ms: Option<u64>) {
        let now = self.clock.now_ms();
        let ttl = ttl_ms.unwrap_or(self.default_ttl_ms);

        self.entries.insert(key.into(), CacheEntry::new(value, now, ttl));
        self.stats.record_set();
    }

    // == Has ==
    /// Same as `get(key).is_some()`, including its side effects on stats and
    /// on expired entries.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and zeroes the statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.reset();
    }

    // == Cleanup ==
    /// Sweeps the whole store once, removing every expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();

        self.entries.retain(|_, entry| !entry.is_expired(now));

        before - self.entries.len()
    }

    // == Keys ==
    /// Returns every stored key, including expired ones not yet swept.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Invalidate Prefix ==
    /// Deletes every key starting with `prefix`. Returns how many were removed.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let mut removed = 0;
        for key in self.keys() {
            if key.starts_with(prefix) && self.delete(&key) {
                removed += 1;
            }
        }
        removed
    }

    // == Peek Entry ==
    /// Returns the raw entry without touching statistics or expiring it.
    pub fn peek_entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }

    /// Current time as seen by this store.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    // == Length ==
    /// Returns the raw number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
