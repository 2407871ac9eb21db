//! API Routes
//!
//! Configures the Axum router with all cache administration endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cleanup_handler, clear_handler, delete_category_handler, delete_handler,
    delete_product_handler, delete_user_handler, get_category_handler, get_handler,
    get_product_handler, get_user_handler, health_handler, invalidate_products_handler,
    keys_handler, set_category_handler, set_handler, set_product_handler, set_user_handler,
    stats_handler, AppState,
};
use crate::middleware::{DeduplicationLayer, ResponseCacheLayer};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Statistics of every store, memoized briefly
/// - `PUT /cache`, `GET /cache`, `DELETE /cache` - Set, list keys, clear
/// - `GET /cache/:key`, `DELETE /cache/:key` - Single-key access
/// - `POST /cleanup` - Sweep every store now
/// - `GET|PUT|DELETE /products/:id`, `DELETE /products` - Product cache
/// - `GET|PUT|DELETE /categories/:category` - Category listings
/// - `GET|PUT|DELETE /users/:id` - User cache
///
/// # Middleware
/// - Deduplication: rejects a repeated mutating request with `409 Conflict`
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let memoized_stats = get(stats_handler).layer(ResponseCacheLayer::new(state.responses.clone()));

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", memoized_stats)
        .route(
            "/cache",
            put(set_handler).get(keys_handler).delete(clear_handler),
        )
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/products", delete(invalidate_products_handler))
        .route(
            "/products/:id",
            get(get_product_handler)
                .put(set_product_handler)
                .delete(delete_product_handler),
        )
        .route(
            "/categories/:category",
            get(get_category_handler)
                .put(set_category_handler)
                .delete(delete_category_handler),
        )
        .route(
            "/users/:id",
            get(get_user_handler)
                .put(set_user_handler)
                .delete(delete_user_handler),
        )
        .layer(DeduplicationLayer::new(state.deduplicator.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
