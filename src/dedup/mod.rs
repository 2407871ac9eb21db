//! Request Deduplication Module
//!
//! Fingerprinting and windowed response recording for repeated mutating
//! requests. The HTTP adapter lives in [`crate::middleware`].

mod deduplicator;
mod fingerprint;

pub use deduplicator::{DedupEntry, RequestDeduplicator, DEFAULT_WINDOW_MS};
pub use fingerprint::{generate_key, Principal, ANONYMOUS};
