//! Request Deduplicator Module
//!
//! Remembers the response of each fingerprinted request for a fixed window so
//! repeats inside that window can be rejected with the original payload.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::fingerprint::generate_key;
use crate::cache::{Clock, SystemClock};
use crate::error::{CacheError, Result};

/// Default deduplication window
pub const DEFAULT_WINDOW_MS: u64 = 1_000;

// == Dedup Entry ==
/// Response recorded for one fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupEntry {
    /// Recording time (Unix milliseconds)
    pub timestamp: u64,
    pub response: Value,
}

// == Request Deduplicator ==
/// Windowed record of processed requests.
///
/// A fingerprint is a duplicate while `now - timestamp < window`; at exactly
/// one window of age it is fresh again.
#[derive(Debug)]
pub struct RequestDeduplicator {
    entries: HashMap<String, DedupEntry>,
    window_ms: u64,
    clock: Arc<dyn Clock>,
}

impl RequestDeduplicator {
    // == Constructor ==
    /// # Errors
    /// `InvalidConfig` if `window_ms` is zero.
    pub fn new(window_ms: u64) -> Result<Self> {
        Self::with_clock(window_ms, Arc::new(SystemClock))
    }

    pub fn with_clock(window_ms: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if window_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "deduplication window must be a positive number of milliseconds".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::new(),
            window_ms,
            clock,
        })
    }

    /// Fingerprint of a request. See [`generate_key`].
    pub fn generate_key(
        method: &str,
        path_and_query: &str,
        principal: Option<&str>,
        body: &[u8],
    ) -> String {
        generate_key(method, path_and_query, principal, body)
    }

    fn within_window(&self, entry: &DedupEntry, now: u64) -> bool {
        now.saturating_sub(entry.timestamp) < self.window_ms
    }

    // == Is Duplicate ==
    pub fn is_duplicate(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| self.within_window(entry, now))
    }

    // == Record Request ==
    /// Stores `response` under `key`, replacing any earlier record.
    pub fn record_request(&mut self, key: impl Into<String>, response: Value) {
        let key = key.into();
        debug!("Recording response for request '{}'", key);
        self.entries.insert(
            key,
            DedupEntry {
                timestamp: self.clock.now_ms(),
                response,
            },
        );
    }

    // == Get Response ==
    /// Returns the recorded response while it is still inside the window.
    pub fn get_response(&self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| self.within_window(entry, now))
            .map(|entry| entry.response.clone())
    }

    // == Cleanup ==
    /// Drops every record that has aged out of the window.
    ///
    /// Returns the number of records removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let window_ms = self.window_ms;
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| now.saturating_sub(entry.timestamp) < window_ms);

        before - self.entries.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
