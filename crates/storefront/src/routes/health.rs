//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::fetch::Fetcher;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the worker is activated and
/// controlling requests.
pub async fn readiness<F: Fetcher>(State(state): State<AppState<F>>) -> StatusCode {
    if state.worker().is_controlling() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
