//! API Handlers
//!
//! HTTP request handlers for the cache administration endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::{Clock, ProductCache, SystemClock, TtlStore, UserCache};
use crate::config::Config;
use crate::dedup::RequestDeduplicator;
use crate::error::{CacheError, Result};
use crate::middleware::{SharedDeduplicator, SharedResponseStore};
use crate::models::{
    CleanupResponse, DedupStats, DeleteResponse, EntityRequest, GetResponse, HealthResponse,
    InvalidateResponse, KeysResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Owns every store instance of the process. Each store sits behind its own
/// lock; the sweepers and middlewares share the same `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// General-purpose store
    pub general: Arc<RwLock<TtlStore<Value>>>,
    pub products: Arc<RwLock<ProductCache<Value>>>,
    pub users: Arc<RwLock<UserCache<Value>>>,
    /// Memoized GET responses
    pub responses: SharedResponseStore,
    pub deduplicator: SharedDeduplicator,
}

impl AppState {
    /// Creates a new AppState from already built stores.
    pub fn new(
        general: TtlStore<Value>,
        products: ProductCache<Value>,
        users: UserCache<Value>,
        responses: TtlStore<Value>,
        deduplicator: RequestDeduplicator,
    ) -> Self {
        Self {
            general: Arc::new(RwLock::new(general)),
            products: Arc::new(RwLock::new(products)),
            users: Arc::new(RwLock::new(users)),
            responses: Arc::new(RwLock::new(responses)),
            deduplicator: Arc::new(RwLock::new(deduplicator)),
        }
    }

    /// Creates a new AppState from configuration, reading the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new AppState whose stores all read time from `clock`.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(
            TtlStore::with_clock(config.default_ttl_ms, clock.clone())?,
            ProductCache::with_clock(config.product_ttl_ms, clock.clone())?,
            UserCache::with_clock(config.user_ttl_ms, clock.clone())?,
            TtlStore::with_clock(config.response_cache_ttl_ms, clock.clone())?,
            RequestDeduplicator::with_clock(config.dedup_window_ms, clock)?,
        ))
    }
}

/// Rejects a request whose DTO failed validation.
fn check(validation: Option<String>) -> Result<()> {
    match validation {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

// == General store ==

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check(req.validate())?;

    let mut cache = state.general.write().await;
    cache.set(req.key.clone(), req.value, req.ttl);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: lookups update stats and may drop an expired entry
    let mut cache = state.general.write().await;
    let value = cache.get(&key).ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.general.write().await;
    if !cache.delete(&key) {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /cache
///
/// Lists raw keys, including expired ones the sweeper has not reached yet.
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let cache = state.general.read().await;
    Json(KeysResponse::new(cache.keys()))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    let mut cache = state.general.write().await;
    let removed = cache.len();
    cache.clear();

    Json(InvalidateResponse::new("general", removed))
}

/// Handler for POST /cleanup
///
/// Runs one sweep over every store right away.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let response = CleanupResponse {
        general: state.general.write().await.cleanup(),
        products: state.products.write().await.store_mut().cleanup(),
        users: state.users.write().await.store_mut().cleanup(),
        responses: state.responses.write().await.cleanup(),
        deduplicator: state.deduplicator.write().await.cleanup(),
    };

    Json(response)
}

// == Products ==

/// Handler for GET /products/:id
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .products
        .write()
        .await
        .get_product(&id)
        .ok_or_else(|| CacheError::NotFound(format!("product {}", id)))?;

    Ok(Json(GetResponse::new(id, value)))
}

/// Handler for PUT /products/:id
pub async fn set_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<SetResponse>> {
    check(req.validate())?;

    state
        .products
        .write()
        .await
        .set_product(&id, req.value, req.ttl);

    Ok(Json(SetResponse::new(id)))
}

/// Handler for DELETE /products/:id
pub async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.products.write().await.invalidate_product(&id) {
        return Err(CacheError::NotFound(format!("product {}", id)));
    }

    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for DELETE /products
pub async fn invalidate_products_handler(
    State(state): State<AppState>,
) -> Json<InvalidateResponse> {
    let removed = state.products.write().await.invalidate_all();
    Json(InvalidateResponse::new("product", removed))
}

/// Handler for GET /categories/:category
pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .products
        .write()
        .await
        .get_by_category(&category)
        .ok_or_else(|| CacheError::NotFound(format!("category {}", category)))?;

    Ok(Json(GetResponse::new(category, value)))
}

/// Handler for PUT /categories/:category
pub async fn set_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<SetResponse>> {
    check(req.validate())?;

    state
        .products
        .write()
        .await
        .set_by_category(&category, req.value, req.ttl);

    Ok(Json(SetResponse::new(category)))
}

/// Handler for DELETE /categories/:category
pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.products.write().await.invalidate_category(&category) {
        return Err(CacheError::NotFound(format!("category {}", category)));
    }

    Ok(Json(DeleteResponse::new(category)))
}

// == Users ==

/// Handler for GET /users/:id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .users
        .write()
        .await
        .get_user(&id)
        .ok_or_else(|| CacheError::NotFound(format!("user {}", id)))?;

    Ok(Json(GetResponse::new(id, value)))
}

/// Handler for PUT /users/:id
pub async fn set_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<SetResponse>> {
    check(req.validate())?;

    state.users.write().await.set_user(&id, req.value, req.ttl);

    Ok(Json(SetResponse::new(id)))
}

/// Handler for DELETE /users/:id
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.users.write().await.invalidate_user(&id) {
        return Err(CacheError::NotFound(format!("user {}", id)));
    }

    Ok(Json(DeleteResponse::new(id)))
}

// == Observability ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let deduplicator = {
        let dedup = state.deduplicator.read().await;
        DedupStats {
            size: dedup.len(),
            window_ms: dedup.window_ms(),
        }
    };

    Json(StatsResponse {
        general: state.general.read().await.stats(),
        products: state.products.read().await.store().stats(),
        users: state.users.read().await.store().stats(),
        responses: state.responses.read().await.stats(),
        deduplicator,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
