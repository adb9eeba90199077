//! Request classification and the caching strategy for each resource kind.

use axum::http::{HeaderName, Method, header};
use tracing::{debug, warn};

use super::fallback;
use super::storage::CacheNamespace;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

static SEC_FETCH_DEST: HeaderName = HeaderName::from_static("sec-fetch-dest");
static SEC_FETCH_MODE: HeaderName = HeaderName::from_static("sec-fetch-mode");

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "bmp"];

/// How an intercepted request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Cache-first from the images namespace.
    Image,
    /// Network-first into the dynamic namespace with shell and offline fallbacks.
    Document,
    /// Network-first into the dynamic namespace, GET only, JSON 503 fallback.
    Api,
    /// Cache-first from the static namespace.
    Static,
}

/// Classify a same-origin request.
///
/// Image and document checks run before the API check; anything else is a
/// static asset.
#[must_use]
pub fn classify(request: &FetchRequest, api_markers: &[String]) -> ResourceKind {
    if is_image(request) {
        ResourceKind::Image
    } else if is_document(request) {
        ResourceKind::Document
    } else if is_api(request, api_markers) {
        ResourceKind::Api
    } else {
        ResourceKind::Static
    }
}

fn is_image(request: &FetchRequest) -> bool {
    if request.header_str(&SEC_FETCH_DEST) == Some("image") {
        return true;
    }
    if request
        .header_str(&header::ACCEPT)
        .is_some_and(|accept| accept.trim_start().starts_with("image/"))
    {
        return true;
    }
    request
        .url
        .path()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn is_document(request: &FetchRequest) -> bool {
    if request.method != Method::GET {
        return false;
    }
    if request.header_str(&SEC_FETCH_MODE) == Some("navigate")
        || request.header_str(&SEC_FETCH_DEST) == Some("document")
    {
        return true;
    }
    request
        .header_str(&header::ACCEPT)
        .and_then(|accept| accept.split(',').next())
        .is_some_and(|preferred| preferred.trim().starts_with("text/html"))
}

fn is_api(request: &FetchRequest, api_markers: &[String]) -> bool {
    let path = request.url.path();
    api_markers.iter().any(|marker| path.contains(marker.as_str()))
}

/// Serve from `namespace` if present; otherwise fetch and store 2xx responses.
///
/// Network failure yields an empty 404.
pub async fn cache_first<F: Fetcher>(
    fetcher: &F,
    namespace: &CacheNamespace,
    request: FetchRequest,
) -> FetchResponse {
    if let Some(hit) = namespace.match_request(&request).await {
        debug!(namespace = namespace.name(), url = %request.url, "Cache hit");
        return hit;
    }

    match fetcher.fetch(request.clone()).await {
        Ok(response) => {
            if response.is_success() {
                namespace.put(&request, response.clone()).await;
            }
            response
        }
        Err(error) => {
            debug!(namespace = namespace.name(), url = %request.url, error = %error, "Serving placeholder");
            fallback::placeholder()
        }
    }
}

/// Fetch a document, falling back to the cached copy, the app shell, then the
/// offline page. Without a `shell_request` the shell step is skipped.
pub async fn network_first_document<F: Fetcher>(
    fetcher: &F,
    dynamic: &CacheNamespace,
    shell: &CacheNamespace,
    shell_request: Option<&FetchRequest>,
    request: FetchRequest,
) -> FetchResponse {
    match fetcher.fetch(request.clone()).await {
        Ok(response) => {
            if response.is_success() {
                dynamic.put(&request, response.clone()).await;
            }
            return response;
        }
        Err(error) => {
            warn!(url = %request.url, error = %error, "Document fetch failed, using cache");
        }
    }

    if let Some(hit) = dynamic.match_request(&request).await {
        return hit;
    }
    if let Some(shell_request) = shell_request
        && let Some(cached_shell) = shell.match_request(shell_request).await
    {
        debug!(url = %request.url, "Serving cached app shell");
        return cached_shell;
    }
    fallback::offline_page()
}

/// Fetch an API request, caching successful GETs for offline reads.
pub async fn network_first_api<F: Fetcher>(
    fetcher: &F,
    dynamic: &CacheNamespace,
    request: FetchRequest,
) -> FetchResponse {
    match fetcher.fetch(request.clone()).await {
        Ok(response) => {
            if response.is_success() && request.method == Method::GET {
                dynamic.put(&request, response.clone()).await;
            }
            return response;
        }
        Err(error) => {
            warn!(method = %request.method, url = %request.url, error = %error, "API fetch failed");
        }
    }

    if request.method != Method::GET {
        return fallback::offline_api();
    }
    dynamic
        .match_request(&request)
        .await
        .unwrap_or_else(fallback::offline_api)
}
