//! Response cache middleware for GET requests.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{request::Parts, Method, Request, Response},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tower::{Layer, Service};
use tracing::debug;

use super::capture::capture_json;
use crate::cache::TtlStore;

/// Store holding memoized response payloads.
pub type SharedResponseStore = Arc<RwLock<TtlStore<Value>>>;

/// Derives the cache key of a request from its head.
pub type KeyGenerator = Arc<dyn Fn(&Parts) -> String + Send + Sync>;

/// Default key: `response:{path?query}`.
pub fn default_key(parts: &Parts) -> String {
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    format!("response:{}", path)
}

/// Adds the replay markers to a cached payload.
///
/// Objects get `cached` and `cachedAt` fields; any other payload is wrapped
/// as `{"data": payload}` first.
fn mark_cached(payload: Value) -> Value {
    let mut object = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    object.insert("cached".to_string(), Value::Bool(true));
    object.insert(
        "cachedAt".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    Value::Object(object)
}

/// Layer that memoizes successful JSON responses to GET requests.
#[derive(Clone)]
pub struct ResponseCacheLayer {
    store: SharedResponseStore,
    key_generator: KeyGenerator,
    ttl_ms: Option<u64>,
}

impl ResponseCacheLayer {
    /// Caches under [`default_key`] with the store's default TTL.
    pub fn new(store: SharedResponseStore) -> Self {
        Self {
            store,
            key_generator: Arc::new(default_key),
            ttl_ms: None,
        }
    }

    pub fn with_key_generator<F>(mut self, key_generator: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(key_generator);
        self
    }

    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }
}

impl<S> Layer<S> for ResponseCacheLayer {
    type Service = ResponseCacheMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCacheMiddleware {
            inner,
            store: self.store.clone(),
            key_generator: self.key_generator.clone(),
            ttl_ms: self.ttl_ms,
        }
    }
}

/// Middleware produced by [`ResponseCacheLayer`].
#[derive(Clone)]
pub struct ResponseCacheMiddleware<S> {
    inner: S,
    store: SharedResponseStore,
    key_generator: KeyGenerator,
    ttl_ms: Option<u64>,
}

impl<S> Service<Request<Body>> for ResponseCacheMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if request.method() != Method::GET {
            return Box::pin(self.inner.call(request));
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let store = self.store.clone();
        let key_generator = self.key_generator.clone();
        let ttl_ms = self.ttl_ms;

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let key = key_generator(&parts);

            let cached = store.write().await.get(&key);
            if let Some(payload) = cached {
                debug!("Serving cached response for {}", key);
                return Ok(Json(mark_cached(payload)).into_response());
            }

            let response = inner.call(Request::from_parts(parts, body)).await?;
            if !response.status().is_success() {
                return Ok(response);
            }

            let (response, payload) = capture_json(response).await;
            if let Some(payload) = payload {
                debug!("Caching response for {}", key);
                store.write().await.set(key, payload, ttl_ms);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn shared_store() -> (SharedResponseStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = TtlStore::with_clock(60_000, clock.clone()).unwrap();
        (Arc::new(RwLock::new(store)), clock)
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_mark_cached_object_and_scalar() {
        let object = mark_cached(json!({"name": "Vase"}));
        assert_eq!(object["name"], "Vase");
        assert_eq!(object["cached"], true);
        assert!(object["cachedAt"].is_string());

        let wrapped = mark_cached(json!([1, 2]));
        assert_eq!(wrapped["data"], json!([1, 2]));
        assert_eq!(wrapped["cached"], true);
    }

    #[test]
    fn test_default_key_includes_query() {
        let request = Request::get("/api/products?page=2").body(()).unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(default_key(&parts), "response:/api/products?page=2");
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let (store, clock) = shared_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let service = ResponseCacheLayer::new(store.clone())
            .with_ttl(1_000)
            .layer(tower::service_fn(move |_req: Request<Body>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Infallible>(Json(json!({"name": "Vase"})).into_response()) }
            }));

        let get = || Request::get("/api/products/42").body(Body::empty()).unwrap();

        let first = body_json(service.clone().oneshot(get()).await.unwrap()).await;
        assert_eq!(first, json!({"name": "Vase"}));

        let second = body_json(service.clone().oneshot(get()).await.unwrap()).await;
        assert_eq!(second["name"], "Vase");
        assert_eq!(second["cached"], true);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(1_001);
        let third = body_json(service.oneshot(get()).await.unwrap()).await;
        assert!(third.get("cached").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_and_other_methods_are_not_cached() {
        let (store, _) = shared_store();

        let service = ResponseCacheLayer::new(store.clone())
            .with_key_generator(|parts: &Parts| format!("custom:{}", parts.uri.path()))
            .layer(tower::service_fn(|req: Request<Body>| async move {
                let status = if req.uri().path() == "/missing" {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                };
                Ok::<_, Infallible>((status, Json(json!({"ok": true}))).into_response())
            }));

        let missing = service
            .clone()
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let post = service
            .clone()
            .oneshot(Request::post("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(post.status(), StatusCode::OK);
        assert!(store.read().await.is_empty());

        service
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(store.read().await.keys(), vec!["custom:/items".to_string()]);
    }
}
