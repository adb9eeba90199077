//! Responses served when neither the network nor the cache can answer.

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::Serialize;

use crate::fetch::FetchResponse;

/// Inline page shown for navigations with no network and no cached shell.
pub const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Offline - Bazaar</title>
  <style>
    body { font-family: system-ui, sans-serif; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f8fafc; color: #0f172a; }
    main { text-align: center; padding: 2rem; }
    button { margin-top: 1.5rem; padding: 0.75rem 1.5rem; border: 0; border-radius: 0.5rem; background: #16a34a; color: #fff; font-size: 1rem; cursor: pointer; }
  </style>
</head>
<body>
  <main>
    <h1>You're offline</h1>
    <p>Check your connection and try again.</p>
    <button type="button" onclick="window.location.reload()">Reload</button>
  </main>
</body>
</html>
"#;

/// Body of the API failure response.
#[derive(Debug, Serialize)]
pub struct OfflineApiBody<'a> {
    pub error: &'a str,
    pub message: &'a str,
}

const OFFLINE_API_BODY: OfflineApiBody<'static> = OfflineApiBody {
    error: "offline",
    message: "The network is unavailable and no cached response exists for this request.",
};

/// `200 text/html` offline page.
#[must_use]
pub fn offline_page() -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    FetchResponse::new(StatusCode::OK, headers, OFFLINE_PAGE)
}

/// `503` JSON `{ "error", "message" }` for API requests that cannot be served.
#[must_use]
pub fn offline_api() -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    let body = serde_json::to_vec(&OFFLINE_API_BODY).unwrap_or_default();
    FetchResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, body)
}

/// Empty `404` for images and static assets that cannot be served.
#[must_use]
pub fn placeholder() -> FetchResponse {
    FetchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "")
}
