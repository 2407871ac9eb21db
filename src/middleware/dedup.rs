//! Deduplication middleware for mutating requests.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use tokio::sync::RwLock;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::capture::{capture_json, MAX_CAPTURE_BYTES};
use crate::dedup::{generate_key, Principal, RequestDeduplicator};
use crate::error::CacheError;
use crate::models::DuplicateResponse;

/// Deduplicator shared between the middleware, the sweeper and the stats view.
pub type SharedDeduplicator = Arc<RwLock<RequestDeduplicator>>;

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Layer that rejects repeated identical mutating requests.
///
/// Only responses that were actually produced are recorded: an inner service
/// error, a panic, a 5xx status or a non-JSON body leaves no record, so a
/// retry goes through. The duplicate check and the recording are separate
/// critical sections; two identical requests racing before the first one
/// completes are both forwarded.
#[derive(Clone)]
pub struct DeduplicationLayer {
    deduplicator: SharedDeduplicator,
}

impl DeduplicationLayer {
    pub fn new(deduplicator: SharedDeduplicator) -> Self {
        Self { deduplicator }
    }

    pub fn deduplicator(&self) -> SharedDeduplicator {
        self.deduplicator.clone()
    }
}

impl<S> Layer<S> for DeduplicationLayer {
    type Service = DeduplicationMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeduplicationMiddleware {
            inner,
            deduplicator: self.deduplicator.clone(),
        }
    }
}

/// Middleware produced by [`DeduplicationLayer`].
#[derive(Clone)]
pub struct DeduplicationMiddleware<S> {
    inner: S,
    deduplicator: SharedDeduplicator,
}

impl<S> Service<Request<Body>> for DeduplicationMiddleware<S>
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
        if !is_mutating(request.method()) {
            return Box::pin(self.inner.call(request));
        }

        // Keep the service that was driven to readiness for this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let deduplicator = self.deduplicator.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = match to_bytes(body, MAX_CAPTURE_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return Ok(CacheError::InvalidRequest(format!(
                        "Request body exceeds {} bytes",
                        MAX_CAPTURE_BYTES
                    ))
                    .into_response());
                }
            };

            let path = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| parts.uri.path());
            let principal = parts.extensions.get::<Principal>().map(Principal::id);
            let key = generate_key(parts.method.as_str(), path, principal, &bytes);

            {
                let guard = deduplicator.read().await;
                if guard.is_duplicate(&key) {
                    let cached = guard.get_response(&key);
                    drop(guard);
                    warn!("Duplicate request rejected: {}", key);
                    return Ok((
                        StatusCode::CONFLICT,
                        Json(DuplicateResponse::new(cached)),
                    )
                        .into_response());
                }
            }

            let request = Request::from_parts(parts, Body::from(bytes));
            let response = inner.call(request).await?;

            if response.status().is_server_error() {
                debug!("Not recording failed response for {}", key);
                return Ok(response);
            }

            let (response, payload) = capture_json(response).await;
            if let Some(payload) = payload {
                deduplicator.write().await.record_request(key, payload);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::{json, Value};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn shared(window_ms: u64) -> (SharedDeduplicator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let dedup = RequestDeduplicator::with_clock(window_ms, clock.clone()).unwrap();
        (Arc::new(RwLock::new(dedup)), clock)
    }

    fn post(body: &'static str, user: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/orders")
            .header("content-type", "application/json")
            .extension(Principal::new(user))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_mutating_methods() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PUT));
        assert!(is_mutating(&Method::PATCH));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::HEAD));
    }

    #[tokio::test]
    async fn test_duplicate_short_circuits_inner_service() {
        let (dedup, clock) = shared(1_000);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let service = DeduplicationLayer::new(dedup).layer(tower::service_fn(
            move |_req: Request<Body>| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, Infallible>(Json(json!({"orderId": n})).into_response()) }
            },
        ));

        let first = service.clone().oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_json(first).await, json!({"orderId": 1}));

        clock.advance(999);
        let second = service.clone().oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(second).await,
            json!({
                "success": false,
                "message": "Duplicate request detected. Request already processed.",
                "isDuplicate": true,
                "cachedResponse": {"orderId": 1}
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(2);
        let third = service.oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
        assert_eq!(third.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_inner_error_is_not_recorded() {
        let (dedup, _) = shared(1_000);

        let failing = DeduplicationLayer::new(dedup.clone()).layer(tower::service_fn(
            |_req: Request<Body>| async {
                Err::<Response<Body>, _>(std::io::Error::other("handler failed"))
            },
        ));

        assert!(failing.oneshot(post(r#"{"a":1}"#, "u1")).await.is_err());
        assert!(dedup.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_not_recorded() {
        let (dedup, _) = shared(1_000);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let service = DeduplicationLayer::new(dedup.clone()).layer(tower::service_fn(
            move |_req: Request<Body>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Ok::<_, Infallible>(
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "db down"})))
                            .into_response(),
                    )
                }
            },
        ));

        for _ in 0..2 {
            let response = service.clone().oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(dedup.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_is_recorded() {
        let (dedup, _) = shared(1_000);

        let service = DeduplicationLayer::new(dedup.clone()).layer(tower::service_fn(
            |_req: Request<Body>| async {
                Ok::<_, Infallible>(
                    (StatusCode::NOT_FOUND, Json(json!({"error": "missing"}))).into_response(),
                )
            },
        ));

        let first = service.clone().oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::NOT_FOUND);

        let second = service.oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["cachedResponse"], json!({"error": "missing"}));
    }

    #[tokio::test]
    async fn test_non_json_response_is_not_recorded() {
        let (dedup, _) = shared(1_000);

        let service = DeduplicationLayer::new(dedup.clone()).layer(tower::service_fn(
            |_req: Request<Body>| async {
                Ok::<_, Infallible>((StatusCode::OK, "accepted").into_response())
            },
        ));

        for _ in 0..2 {
            let response = service.clone().oneshot(post(r#"{"a":1}"#, "u1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], b"accepted");
        }
        assert!(dedup.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_passes_through_untouched() {
        let (dedup, _) = shared(1_000);

        let service = DeduplicationLayer::new(dedup.clone()).layer(tower::service_fn(
            |_req: Request<Body>| async {
                Ok::<_, Infallible>(Json(json!({"items": []})).into_response())
            },
        ));

        for _ in 0..2 {
            let response = service
                .clone()
                .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert!(dedup.read().await.is_empty());
    }
}
