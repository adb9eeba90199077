//! Fallback handler: every request not routed elsewhere goes through the
//! caching worker to the upstream origin.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::debug;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::{FetchRequest, Fetcher, is_hop_by_hop};
use crate::state::AppState;
use crate::worker::Intercept;

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Serve a request through the worker.
///
/// Passthrough requests are forwarded to the network as-is; a network failure
/// there is a 502.
pub async fn forward<F: Fetcher>(
    State(state): State<AppState<F>>,
    request: Request,
) -> Result<Response> {
    let fetch = to_fetch_request(&state.config().worker.origin, request).await?;
    let worker = state.worker();

    let response = match worker.handle_fetch(fetch).await {
        Intercept::Handled(response) => response,
        Intercept::Passthrough(fetch) => {
            debug!(url = %fetch.url, "Forwarding without worker");
            worker.network().fetch(fetch).await?
        }
    };

    Ok(response.into_response())
}

/// Rebase an incoming request onto the upstream origin.
///
/// Only the path and query of the incoming URI are used; the result always
/// targets `origin`.
///
/// # Errors
///
/// Returns `BadRequest` if the rebased URL leaves the origin or the body is
/// too large.
pub async fn to_fetch_request(origin: &Url, request: Request) -> Result<FetchRequest> {
    let (parts, body) = request.into_parts();

    let mut url = origin.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());
    if url.origin() != origin.origin() {
        return Err(AppError::BadRequest(format!(
            "path {} leaves the upstream origin",
            parts.uri.path()
        )));
    }

    let mut headers = HeaderMap::with_capacity(parts.headers.len());
    for (name, value) in &parts.headers {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable body: {e}")))?;

    Ok(FetchRequest {
        method: parts.method,
        url,
        headers,
        body,
    })
}
