//! Tower middleware built on the cache core.
//!
//! - `DeduplicationLayer`: rejects repeated identical POST/PUT/PATCH/DELETE
//!   requests inside a time window with `409 Conflict`
//! - `ResponseCacheLayer`: memoizes successful JSON responses to GET requests

mod capture;
mod dedup;
mod response_cache;

pub use capture::MAX_CAPTURE_BYTES;
pub use dedup::{DeduplicationLayer, DeduplicationMiddleware, SharedDeduplicator};
pub use response_cache::{
    default_key, KeyGenerator, ResponseCacheLayer, ResponseCacheMiddleware, SharedResponseStore,
};
