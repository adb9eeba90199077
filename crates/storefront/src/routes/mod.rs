//! HTTP route handlers for the edge proxy.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness (worker activated)
//!
//! # Worker side channels
//! GET  /__worker/events                 - SSE stream of worker messages
//! GET  /__worker/status                 - Lifecycle state and namespace sizes
//! POST /__worker/sync/{tag}             - Background sync event
//! POST /__worker/push                   - Push message -> notification
//! POST /__worker/notification-click     - Notification click -> client action
//!
//! # Everything else
//! *    /*                               - Through the caching worker to the origin
//! ```

pub mod health;
pub mod proxy;
pub mod worker;

use axum::{Router, middleware, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::fetch::Fetcher;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create all routes for the edge proxy.
pub fn routes<F: Fetcher>() -> Router<AppState<F>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<F>))
        .nest("/__worker", worker::router::<F>())
        .fallback(proxy::forward::<F>)
}

/// Full application with middleware and state applied.
pub fn app<F: Fetcher>(state: AppState<F>) -> Router {
    routes::<F>()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
