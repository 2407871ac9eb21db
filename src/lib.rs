//! Storefront Cache - in-process caching for a storefront backend
//!
//! TTL key-value stores with hit/miss statistics, product and user caches,
//! duplicate-request suppression for mutating calls, short-lived memoization
//! of GET responses, and background sweepers. An axum admin API exposes the
//! stores over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_cleanup_task, CleanupHandle};
