//! Cache Module
//!
//! Provides in-memory caching with per-entry TTL expiration and periodic
//! sweeping. Expiry is checked lazily on every read; the sweep only bounds
//! memory for keys that are never read again.

mod clock;
mod domain;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use domain::{ProductCache, UserCache, GENERAL_TTL_MS, PRODUCT_TTL_MS, USER_TTL_MS};
pub use entry::CacheEntry;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::TtlStore;
