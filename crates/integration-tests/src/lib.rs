//! Integration tests for the Bazaar storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `offline_search` - Search coordinator running through the caching worker
//! - `edge_proxy` - Edge proxy routes driven with `tower::ServiceExt::oneshot`
//! - `worker_lifecycle` - Install, activation, version bumps and image eviction
//!
//! Every test runs against [`FakeNetwork`], an in-memory upstream that can be
//! taken offline mid-test. Nothing touches a real socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bazaar_core::{Product, SearchResult};
use bazaar_storefront::config::{SearchBackendConfig, StorefrontConfig, WorkerConfig};
use bazaar_storefront::fetch::{FetchRequest, FetchResponse, Fetcher, NetworkError};
use secrecy::SecretString;
use url::Url;

/// Origin every fake resource lives under.
pub const ORIGIN: &str = "https://shop.bazaar.test";

/// In-memory upstream. Cheap to clone; clones share routes and the request log.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    offline: AtomicBool,
    routes: Mutex<HashMap<String, FetchResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeNetwork {
    /// An online network with nothing served.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An online network serving the default static manifest and app shell.
    #[must_use]
    pub fn with_storefront_assets() -> Self {
        let network = Self::new();
        network.serve("/", ok("text/html", "<html>shell</html>"));
        network.serve("/manifest.json", ok("application/json", "{}"));
        network.serve("/favicon.ico", ok("image/x-icon", "ico"));
        network
    }

    /// Serve `response` for `path`.
    ///
    /// `path` may include a query string; an exact path-and-query match wins
    /// over a path-only match.
    pub fn serve(&self, path: &str, response: FetchResponse) {
        self.inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), response);
    }

    /// Fail every following request with a network error.
    pub fn go_offline(&self) {
        self.inner.offline.store(true, Ordering::SeqCst);
    }

    /// Answer requests again.
    pub fn go_online(&self) {
        self.inner.offline.store(false, Ordering::SeqCst);
    }

    /// Every request seen so far, as `METHOD url`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests whose URL path is `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter_map(|line| line.split_once(' '))
            .filter_map(|(_, url)| Url::parse(url).ok())
            .filter(|url| url.path() == path)
            .count()
    }
}

impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError> {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{} {}", request.method, request.url));

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unavailable("fake network offline".to_string()));
        }

        let path = request.url.path();
        let routes = self
            .inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let exact = request
            .url
            .query()
            .and_then(|query| routes.get(&format!("{path}?{query}")));

        Ok(exact
            .or_else(|| routes.get(path))
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "")))
    }
}

/// A 200 response with the given content type.
#[must_use]
pub fn ok(content_type: &'static str, body: impl Into<bytes::Bytes>) -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    FetchResponse::new(StatusCode::OK, headers, body)
}

/// A 200 JSON response carrying one page of search results.
///
/// # Panics
///
/// Panics if the page cannot be serialized.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn search_page(ids: &[&str], page: u32, has_more: bool) -> FetchResponse {
    let result = SearchResult {
        products: ids
            .iter()
            .map(|id| Product::new(*id, format!("Product {id}"), 1500))
            .collect(),
        total_count: 40,
        has_more,
        page,
    };
    ok("application/json", serde_json::to_vec(&result).unwrap())
}

/// The origin as a URL.
///
/// # Panics
///
/// Panics if [`ORIGIN`] is not a valid URL.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

/// A GET request for `path` on the origin.
///
/// # Panics
///
/// Panics if `path` cannot be joined onto the origin.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn get(path: &str) -> FetchRequest {
    FetchRequest::get(origin().join(path).unwrap())
}

/// Worker configuration for [`ORIGIN`] with the default manifest.
#[must_use]
pub fn worker_config() -> WorkerConfig {
    WorkerConfig::new(origin())
}

/// Edge proxy configuration for [`ORIGIN`] without Sentry.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        worker: worker_config(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Search backend configuration pointing at `{ORIGIN}/api/`.
///
/// # Panics
///
/// Panics if the base URL cannot be joined.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn backend_config() -> SearchBackendConfig {
    SearchBackendConfig::new(
        origin().join("/api/").unwrap(),
        SecretString::from("sk-live-9f3a72c1d8e4"),
    )
}
