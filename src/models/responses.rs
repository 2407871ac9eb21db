//! Response DTOs for the cache admin API and middlewares
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::StatsSnapshot;

/// Message returned with every rejected duplicate request
pub const DUPLICATE_MESSAGE: &str = "Duplicate request detected. Request already processed.";

/// Response body for a cache read
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for a cache write
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for a single-key delete
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for bulk invalidation and clear
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(scope: &str, removed: usize) -> Self {
        Self {
            message: format!("Invalidated {} {} entries", removed, scope),
            removed,
        }
    }
}

/// Response body for `GET /cache`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    /// Raw key listing, may include expired keys not yet swept
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Deduplicator view inside [`StatsResponse`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub size: usize,
    pub window_ms: u64,
}

/// Response body for the stats endpoint (`GET /stats`)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub general: StatsSnapshot,
    pub products: StatsSnapshot,
    pub users: StatsSnapshot,
    pub responses: StatsSnapshot,
    pub deduplicator: DedupStats,
}

/// Response body for `POST /cleanup`: entries removed per store
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupResponse {
    pub general: usize,
    pub products: usize,
    pub users: usize,
    pub responses: usize,
    pub deduplicator: usize,
}

impl CleanupResponse {
    pub fn total(&self) -> usize {
        self.general + self.products + self.users + self.responses + self.deduplicator
    }
}

/// Response body for the health endpoint (`GET /health`)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body of the `409 Conflict` sent for a duplicate request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResponse {
    pub success: bool,
    pub message: String,
    pub is_duplicate: bool,
    /// Payload recorded for the original request, `null` if none
    pub cached_response: Option<Value>,
}

impl DuplicateResponse {
    pub fn new(cached_response: Option<Value>) -> Self {
        Self {
            success: false,
            message: DUPLICATE_MESSAGE.to_string(),
            is_duplicate: true,
            cached_response,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
