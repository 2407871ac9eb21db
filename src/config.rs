//! Configuration Module
//!
//! Loads server and cache configuration from environment variables. Every
//! duration is in milliseconds.

use std::env;

use crate::cache::{GENERAL_TTL_MS, PRODUCT_TTL_MS, USER_TTL_MS};
use crate::dedup::DEFAULT_WINDOW_MS;
use crate::error::{CacheError, Result};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Default TTL of the general-purpose store
    pub default_ttl_ms: u64,
    /// Default TTL of the product cache
    pub product_ttl_ms: u64,
    /// Default TTL of the user cache
    pub user_ttl_ms: u64,
    /// TTL of memoized GET responses
    pub response_cache_ttl_ms: u64,
    /// Interval between sweeps of the cache stores
    pub cache_cleanup_interval_ms: u64,
    /// Deduplication window
    pub dedup_window_ms: u64,
    /// Interval between deduplicator sweeps
    pub dedup_cleanup_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL_MS` - General store TTL (default: 300000)
    /// - `PRODUCT_TTL_MS` - Product cache TTL (default: 600000)
    /// - `USER_TTL_MS` - User cache TTL (default: 300000)
    /// - `RESPONSE_CACHE_TTL_MS` - Memoized response TTL (default: 1000)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Store sweep frequency (default: 60000)
    /// - `DEDUP_WINDOW_MS` - Deduplication window (default: 1000)
    /// - `DEDUP_CLEANUP_INTERVAL_MS` - Deduplicator sweep frequency (default: 2 x window)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// # Errors
    /// `InvalidConfig` if a variable is set but does not parse, or if the
    /// resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let dedup_window_ms = parse_var(&lookup, "DEDUP_WINDOW_MS", defaults.dedup_window_ms)?;

        let config = Self {
            default_ttl_ms: parse_var(&lookup, "DEFAULT_TTL_MS", defaults.default_ttl_ms)?,
            product_ttl_ms: parse_var(&lookup, "PRODUCT_TTL_MS", defaults.product_ttl_ms)?,
            user_ttl_ms: parse_var(&lookup, "USER_TTL_MS", defaults.user_ttl_ms)?,
            response_cache_ttl_ms: parse_var(
                &lookup,
                "RESPONSE_CACHE_TTL_MS",
                defaults.response_cache_ttl_ms,
            )?,
            cache_cleanup_interval_ms: parse_var(
                &lookup,
                "CACHE_CLEANUP_INTERVAL_MS",
                defaults.cache_cleanup_interval_ms,
            )?,
            dedup_window_ms,
            dedup_cleanup_interval_ms: parse_var(
                &lookup,
                "DEDUP_CLEANUP_INTERVAL_MS",
                dedup_window_ms.saturating_mul(2),
            )?,
            server_port: parse_var(&lookup, "SERVER_PORT", defaults.server_port)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects zero durations, which would make every entry expire at once or
    /// spin the sweepers.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("DEFAULT_TTL_MS", self.default_ttl_ms),
            ("PRODUCT_TTL_MS", self.product_ttl_ms),
            ("USER_TTL_MS", self.user_ttl_ms),
            ("RESPONSE_CACHE_TTL_MS", self.response_cache_ttl_ms),
            ("CACHE_CLEANUP_INTERVAL_MS", self.cache_cleanup_interval_ms),
            ("DEDUP_WINDOW_MS", self.dedup_window_ms),
            ("DEDUP_CLEANUP_INTERVAL_MS", self.dedup_cleanup_interval_ms),
        ];

        match durations.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(CacheError::InvalidConfig(format!(
                "{} must be a positive number of milliseconds",
                name
            ))),
            None => Ok(()),
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            CacheError::InvalidConfig(format!("{} has an invalid value: '{}'", name, raw))
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_ms: GENERAL_TTL_MS,
            product_ttl_ms: PRODUCT_TTL_MS,
            user_ttl_ms: USER_TTL_MS,
            response_cache_ttl_ms: 1_000,
            cache_cleanup_interval_ms: 60_000,
            dedup_window_ms: DEFAULT_WINDOW_MS,
            dedup_cleanup_interval_ms: DEFAULT_WINDOW_MS * 2,
            server_port: 3000,
        }
    }
}
