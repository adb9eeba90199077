//! Caching worker.
//!
//! Sits between clients and the origin, answering same-origin requests from
//! four versioned cache namespaces:
//!
//! | Namespace | Holds | Strategy |
//! |-----------|-------|----------|
//! | `<prefix>-shell-<version>` | app shell document | install-time seed, document fallback |
//! | `<prefix>-static-<version>` | build artifacts | cache-first |
//! | `<prefix>-dynamic-<version>` | documents, API GETs | network-first |
//! | `<prefix>-images-<version>` | images | cache-first, 7-day eviction |
//!
//! # Lifecycle
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant (precache failed)
//! ```
//!
//! Until the worker is activated it does not control clients and every
//! request passes through to the network.

pub mod eviction;
pub mod fallback;
pub mod messages;
pub mod storage;
pub mod strategy;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::WorkerConfig;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher, NetworkError};

pub use eviction::{SweepReport, spawn_eviction_task, sweep_namespace};
pub use messages::{BACKGROUND_SYNC_TAG, ClientAction, Notification, SyncOutcome, WorkerMessage};
pub use storage::{CacheNamespace, CacheStorage};
pub use strategy::{ResourceKind, classify};

const CLIENT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Errors from install and activation.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid asset path {path}: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to fetch {url}: {source}")]
    Network {
        url: Url,
        #[source]
        source: NetworkError,
    },

    #[error("{url} returned {status}")]
    BadStatus { url: Url, status: StatusCode },

    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },
}

/// What the worker did with a request.
#[derive(Debug)]
pub enum Intercept {
    /// Answered by a caching strategy.
    Handled(FetchResponse),
    /// Not ours; the caller should send it to the network unchanged.
    Passthrough(FetchRequest),
}

/// Names of the four current namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNames {
    pub shell: String,
    pub static_assets: String,
    pub dynamic: String,
    pub images: String,
}

impl NamespaceNames {
    /// Names for `prefix` and `version`.
    #[must_use]
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            shell: format!("{prefix}-shell-{version}"),
            static_assets: format!("{prefix}-static-{version}"),
            dynamic: format!("{prefix}-dynamic-{version}"),
            images: format!("{prefix}-images-{version}"),
        }
    }

    /// Whether `name` is one of the current namespaces.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        [&self.shell, &self.static_assets, &self.dynamic, &self.images]
            .iter()
            .any(|current| current.as_str() == name)
    }
}

/// Outcome of [`CacheWorker::activate`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Stale namespaces that were deleted.
    pub deleted: Vec<String>,
}

/// Worker status as exposed to operators.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub version: String,
    pub controlling: bool,
    pub namespaces: Vec<NamespaceStatus>,
}

/// Entry count of one namespace.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStatus {
    pub name: String,
    pub entries: usize,
}

/// The caching worker. Cheap to clone.
pub struct CacheWorker<F> {
    inner: Arc<WorkerInner<F>>,
}

impl<F> Clone for CacheWorker<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct WorkerInner<F> {
    config: WorkerConfig,
    fetcher: F,
    storage: CacheStorage,
    names: NamespaceNames,
    state: watch::Sender<WorkerState>,
    claimed: AtomicBool,
    clients: broadcast::Sender<WorkerMessage>,
}

impl<F: Fetcher> CacheWorker<F> {
    /// Create a worker in the [`WorkerState::Parsed`] state.
    ///
    /// `storage` may already hold namespaces from an earlier version; they are
    /// removed on activation.
    pub fn new(config: WorkerConfig, fetcher: F, storage: CacheStorage) -> Self {
        let names = NamespaceNames::new(&config.cache_prefix, &config.cache_version);
        let (state, _) = watch::channel(WorkerState::Parsed);
        let (clients, _) = broadcast::channel(CLIENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(WorkerInner {
                config,
                fetcher,
                storage,
                names,
                state,
                claimed: AtomicBool::new(false),
                clients,
            }),
        }
    }

    /// Worker configuration.
    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    /// The cache store.
    #[must_use]
    pub fn storage(&self) -> &CacheStorage {
        &self.inner.storage
    }

    /// Current namespace names.
    #[must_use]
    pub fn names(&self) -> &NamespaceNames {
        &self.inner.names
    }

    /// The network fetcher behind the worker.
    #[must_use]
    pub fn network(&self) -> &F {
        &self.inner.fetcher
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.inner.state.subscribe()
    }

    /// Whether the worker answers requests (activated and clients claimed).
    #[must_use]
    pub fn is_controlling(&self) -> bool {
        self.state() == WorkerState::Activated && self.inner.claimed.load(Ordering::Acquire)
    }

    /// Receive client broadcasts.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.inner.clients.subscribe()
    }

    /// Snapshot for the status endpoint.
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        let storage = self.storage();
        let namespaces = storage
            .names()
            .into_iter()
            .map(|name| NamespaceStatus {
                entries: storage.open(&name).len(),
                name,
            })
            .collect();

        WorkerStatus {
            state: self.state(),
            version: self.inner.config.cache_version.clone(),
            controlling: self.is_controlling(),
            namespaces,
        }
    }

    fn set_state(&self, state: WorkerState) {
        debug!(state = ?state, "Worker state changed");
        self.inner.state.send_replace(state);
    }

    fn shell_request(&self) -> Result<FetchRequest, WorkerError> {
        self.asset_request(&self.inner.config.shell_path)
    }

    fn asset_request(&self, path: &str) -> Result<FetchRequest, WorkerError> {
        let url = self
            .inner
            .config
            .origin
            .join(path)
            .map_err(|source| WorkerError::InvalidUrl {
                path: path.to_string(),
                source,
            })?;
        Ok(FetchRequest::get(url))
    }

    /// Precache the static manifest and the app shell, then skip waiting.
    ///
    /// All-or-nothing: if any asset fails, nothing is stored and the worker
    /// becomes [`WorkerState::Redundant`].
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not freshly parsed or an asset fails.
    #[instrument(skip(self), fields(version = %self.inner.config.cache_version))]
    pub async fn install(&self) -> Result<(), WorkerError> {
        let state = self.state();
        if state != WorkerState::Parsed {
            return Err(WorkerError::InvalidState {
                operation: "install",
                state,
            });
        }
        self.set_state(WorkerState::Installing);

        match self.precache().await {
            Ok(count) => {
                info!(assets = count, "Worker installed");
                // Skip waiting: an installed worker may activate immediately.
                self.set_state(WorkerState::Installed);
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "Worker install failed");
                self.set_state(WorkerState::Redundant);
                Err(error)
            }
        }
    }

    async fn precache(&self) -> Result<usize, WorkerError> {
        let config = &self.inner.config;

        let statics = config
            .static_manifest
            .iter()
            .map(|path| self.asset_request(path))
            .collect::<Result<Vec<_>, _>>()?;
        let shell = if config.shell_path.is_empty() {
            None
        } else {
            Some(self.shell_request()?)
        };

        let fetched_statics = try_join_all(statics.into_iter().map(|r| self.fetch_asset(r))).await?;
        let fetched_shell = match shell {
            Some(request) => Some(self.fetch_asset(request).await?),
            None => None,
        };

        let static_ns = self.inner.storage.open(&self.inner.names.static_assets);
        let count = fetched_statics.len() + usize::from(fetched_shell.is_some());
        for (request, response) in fetched_statics {
            static_ns.put(&request, response).await;
        }
        if let Some((request, response)) = fetched_shell {
            self.inner
                .storage
                .open(&self.inner.names.shell)
                .put(&request, response)
                .await;
        }
        Ok(count)
    }

    async fn fetch_asset(
        &self,
        request: FetchRequest,
    ) -> Result<(FetchRequest, FetchResponse), WorkerError> {
        let url = request.url.clone();
        let response = self
            .inner
            .fetcher
            .fetch(request.clone())
            .await
            .map_err(|source| WorkerError::Network {
                url: url.clone(),
                source,
            })?;
        if !response.is_success() {
            return Err(WorkerError::BadStatus {
                url,
                status: response.status,
            });
        }
        Ok((request, response))
    }

    /// Delete stale namespaces, claim clients and announce the new version.
    ///
    /// # Errors
    ///
    /// Returns an error unless the worker is [`WorkerState::Installed`].
    #[instrument(skip(self), fields(version = %self.inner.config.cache_version))]
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let state = self.state();
        if state != WorkerState::Installed {
            return Err(WorkerError::InvalidState {
                operation: "activate",
                state,
            });
        }
        self.set_state(WorkerState::Activating);

        let storage = &self.inner.storage;
        let names = &self.inner.names;
        let mut report = ActivationReport::default();
        for name in storage.names() {
            if !names.contains(&name) && storage.delete(&name) {
                info!(namespace = %name, "Deleted stale cache namespace");
                report.deleted.push(name);
            }
        }
        for name in [&names.shell, &names.static_assets, &names.dynamic, &names.images] {
            let _ = storage.open(name);
        }

        self.inner.claimed.store(true, Ordering::Release);
        self.set_state(WorkerState::Activated);

        let version = self.inner.config.cache_version.clone();
        let notified = self
            .inner
            .clients
            .send(WorkerMessage::UpdateAvailable { version })
            .unwrap_or(0);
        info!(
            deleted = report.deleted.len(),
            notified, "Worker activated"
        );
        Ok(report)
    }

    /// Route a request to its caching strategy.
    ///
    /// Cross-origin requests, and every request before activation, pass
    /// through untouched.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn handle_fetch(&self, request: FetchRequest) -> Intercept {
        if request.url.origin() != self.inner.config.origin.origin() || !self.is_controlling() {
            return Intercept::Passthrough(request);
        }

        let inner = &self.inner;
        let storage = &inner.storage;
        let names = &inner.names;
        let kind = classify(&request, &inner.config.api_markers);
        debug!(kind = ?kind, "Intercepted");

        let response = match kind {
            ResourceKind::Image => {
                strategy::cache_first(&inner.fetcher, &storage.open(&names.images), request).await
            }
            ResourceKind::Static => {
                strategy::cache_first(&inner.fetcher, &storage.open(&names.static_assets), request)
                    .await
            }
            ResourceKind::Api => {
                strategy::network_first_api(&inner.fetcher, &storage.open(&names.dynamic), request)
                    .await
            }
            ResourceKind::Document => {
                let shell_request = self
                    .shell_request()
                    .inspect_err(|error| warn!(error = %error, "Invalid shell path"))
                    .ok();
                strategy::network_first_document(
                    &inner.fetcher,
                    &storage.open(&names.dynamic),
                    &storage.open(&names.shell),
                    shell_request.as_ref(),
                    request,
                )
                .await
            }
        };
        Intercept::Handled(response)
    }

    /// Delete images whose `date` is older than the configured maximum age.
    #[instrument(skip(self))]
    pub async fn sweep_expired_images(&self, now: DateTime<Utc>) -> SweepReport {
        let images = self.inner.storage.open(&self.inner.names.images);
        sweep_namespace(&images, now, self.inner.config.image_max_age).await
    }

    /// Acknowledge a background sync event.
    #[must_use]
    pub fn handle_sync(&self, tag: &str) -> SyncOutcome {
        if tag == BACKGROUND_SYNC_TAG {
            debug!(tag, "Background sync acknowledged");
            SyncOutcome::Completed
        } else {
            debug!(tag, "Ignoring unknown sync tag");
            SyncOutcome::Ignored
        }
    }

    /// Notification to display for a push payload.
    #[must_use]
    pub fn handle_push(&self, payload: &[u8]) -> Notification {
        let notification = Notification::from_payload(payload);
        debug!(title = %notification.title, "Push received");
        notification
    }

    /// Open the notification's page, resolved against the origin.
    #[must_use]
    pub fn handle_notification_click(&self, notification: &Notification) -> ClientAction {
        let url = self
            .inner
            .config
            .origin
            .join(&notification.url)
            .map_or_else(|_| notification.url.clone(), String::from);
        ClientAction::OpenWindow { url }
    }
}

impl<F: Fetcher> Fetcher for CacheWorker<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError> {
        match self.handle_fetch(request).await {
            Intercept::Handled(response) => Ok(response),
            Intercept::Passthrough(request) => self.inner.fetcher.fetch(request).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::http::{HeaderMap, HeaderValue, Method, header};
    use chrono::TimeDelta;

    use super::*;
    use crate::fetch::format_http_date;

    const ORIGIN: &str = "https://shop.test";

    /// Network double: serves registered paths while online.
    #[derive(Default)]
    struct FakeNetwork {
        online: AtomicBool,
        routes: Mutex<HashMap<String, FetchResponse>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeNetwork {
        fn online() -> Self {
            let network = Self::default();
            network.online.store(true, Ordering::SeqCst);
            network
        }

        fn serve(&self, path: &str, response: FetchResponse) {
            self.routes.lock().unwrap().insert(path.to_string(), response);
        }

        fn go_offline(&self) {
            self.online.store(false, Ordering::SeqCst);
        }

        fn hits(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Fetcher for Arc<FakeNetwork> {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError> {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{} {}", request.method, request.url));
            if !self.online.load(Ordering::SeqCst) {
                return Err(NetworkError::Unavailable("offline".to_string()));
            }
            let path = match request.url.query() {
                Some(query) => format!("{}?{query}", request.url.path()),
                None => request.url.path().to_string(),
            };
            Ok(self
                .routes
                .lock()
                .unwrap()
                .get(&path)
                .cloned()
                .unwrap_or_else(|| FetchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "")))
        }
    }

    fn ok(content_type: &'static str, body: &'static str) -> FetchResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        FetchResponse::new(StatusCode::OK, headers, body)
    }

    fn config() -> WorkerConfig {
        let mut config = WorkerConfig::new(Url::parse(ORIGIN).unwrap());
        config.static_manifest = vec!["/manifest.json".to_string()];
        config
    }

    fn seeded_network() -> Arc<FakeNetwork> {
        let network = Arc::new(FakeNetwork::online());
        network.serve("/", ok("text/html", "<html>shell</html>"));
        network.serve("/manifest.json", ok("application/json", "{}"));
        network
    }

    async fn active_worker(network: &Arc<FakeNetwork>) -> CacheWorker<Arc<FakeNetwork>> {
        let worker = CacheWorker::new(config(), Arc::clone(network), CacheStorage::new(100));
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        worker
    }

    fn get(path: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
    }

    fn navigate(path: &str) -> FetchRequest {
        get(path).with_header(header::ACCEPT, HeaderValue::from_static("text/html"))
    }

    async fn respond(worker: &CacheWorker<Arc<FakeNetwork>>, request: FetchRequest) -> FetchResponse {
        match worker.handle_fetch(request).await {
            Intercept::Handled(response) => response,
            Intercept::Passthrough(request) => panic!("unexpected passthrough for {}", request.url),
        }
    }

    #[test]
    fn test_namespace_names() {
        let names = NamespaceNames::new("bazaar", "v2");
        assert_eq!(names.shell, "bazaar-shell-v2");
        assert_eq!(names.static_assets, "bazaar-static-v2");
        assert_eq!(names.dynamic, "bazaar-dynamic-v2");
        assert_eq!(names.images, "bazaar-images-v2");
        assert!(names.contains("bazaar-images-v2"));
        assert!(!names.contains("bazaar-images-v1"));
    }

    #[tokio::test]
    async fn test_install_precaches_manifest_and_shell() {
        let network = seeded_network();
        let worker = CacheWorker::new(config(), Arc::clone(&network), CacheStorage::new(100));
        assert_eq!(worker.state(), WorkerState::Parsed);

        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);

        let storage = worker.storage();
        let static_ns = storage.open(&worker.names().static_assets);
        assert!(static_ns.match_request(&get("/manifest.json")).await.is_some());
        let shell_ns = storage.open(&worker.names().shell);
        assert_eq!(shell_ns.match_request(&get("/")).await.unwrap().body, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let network = seeded_network();
        let mut config = config();
        config.static_manifest.push("/missing.css".to_string());
        let worker = CacheWorker::new(config, Arc::clone(&network), CacheStorage::new(100));

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::BadStatus { status, .. } if status == StatusCode::NOT_FOUND));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(worker.storage().open(&worker.names().static_assets).is_empty());
        assert!(worker.activate().await.is_err());
    }

    #[tokio::test]
    async fn test_passthrough_before_activation() {
        let network = seeded_network();
        let worker = CacheWorker::new(config(), Arc::clone(&network), CacheStorage::new(100));
        worker.install().await.unwrap();

        assert!(matches!(
            worker.handle_fetch(get("/img/a.png")).await,
            Intercept::Passthrough(_)
        ));
    }

    #[tokio::test]
    async fn test_cross_origin_passes_through() {
        let network = seeded_network();
        let worker = active_worker(&network).await;
        let request = FetchRequest::get(Url::parse("https://cdn.other.test/a.png").unwrap());

        match worker.handle_fetch(request).await {
            Intercept::Passthrough(request) => {
                assert_eq!(request.url.as_str(), "https://cdn.other.test/a.png");
            }
            Intercept::Handled(_) => panic!("cross-origin request was intercepted"),
        }
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_namespaces_and_notifies() {
        let network = seeded_network();
        let storage = CacheStorage::new(100);
        let _ = storage.open("bazaar-images-v0");
        let _ = storage.open("bazaar-dynamic-v0");
        let _ = storage.open("other-app-cache");

        let worker = CacheWorker::new(config(), Arc::clone(&network), storage.clone());
        let mut client = worker.subscribe();
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(
            report.deleted,
            ["bazaar-dynamic-v0", "bazaar-images-v0", "other-app-cache"]
        );
        assert_eq!(
            storage.names(),
            [
                "bazaar-dynamic-v1",
                "bazaar-images-v1",
                "bazaar-shell-v1",
                "bazaar-static-v1"
            ]
        );
        assert!(worker.is_controlling());
        assert_eq!(
            client.recv().await.unwrap(),
            WorkerMessage::UpdateAvailable {
                version: "v1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_image_cache_hit_skips_network() {
        let network = seeded_network();
        network.serve("/img/p1.webp", ok("image/webp", "webp-bytes"));
        let worker = active_worker(&network).await;

        let first = respond(&worker, get("/img/p1.webp")).await;
        assert_eq!(first.body, "webp-bytes");
        let hits = network.hits();

        let second = respond(&worker, get("/img/p1.webp")).await;
        assert_eq!(second.body, "webp-bytes");
        assert_eq!(network.hits(), hits);
    }

    #[tokio::test]
    async fn test_image_failure_yields_placeholder() {
        let network = seeded_network();
        let worker = active_worker(&network).await;
        network.go_offline();

        let response = respond(&worker, get("/img/missing.png")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_static_served_from_precache_offline() {
        let network = seeded_network();
        let worker = active_worker(&network).await;
        network.go_offline();

        let response = respond(&worker, get("/manifest.json")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "{}");
    }

    #[tokio::test]
    async fn test_document_network_first_then_exact_cache() {
        let network = seeded_network();
        network.serve("/products/mug", ok("text/html", "<html>mug</html>"));
        let worker = active_worker(&network).await;

        assert_eq!(respond(&worker, navigate("/products/mug")).await.body, "<html>mug</html>");
        network.go_offline();
        assert_eq!(respond(&worker, navigate("/products/mug")).await.body, "<html>mug</html>");
    }

    #[tokio::test]
    async fn test_document_falls_back_to_shell() {
        let network = seeded_network();
        let worker = active_worker(&network).await;
        network.go_offline();

        let response = respond(&worker, navigate("/account/orders")).await;
        assert_eq!(response.body, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_document_offline_page_without_shell() {
        let network = seeded_network();
        let mut config = config();
        config.shell_path = String::new();
        let worker = CacheWorker::new(config, Arc::clone(&network), CacheStorage::new(100));
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        network.go_offline();

        let response = respond(&worker, navigate("/cart")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, fallback::OFFLINE_PAGE);
    }

    #[tokio::test]
    async fn test_api_caches_get_only() {
        let network = seeded_network();
        network.serve("/rest/v1/products", ok("application/json", "[1]"));
        let worker = active_worker(&network).await;
        let dynamic = worker.storage().open(&worker.names().dynamic);

        let post = FetchRequest::new(Method::POST, get("/rest/v1/products").url);
        assert_eq!(respond(&worker, post.clone()).await.status, StatusCode::OK);
        assert!(dynamic.is_empty());

        respond(&worker, get("/rest/v1/products")).await;
        assert_eq!(dynamic.keys(), ["GET https://shop.test/rest/v1/products"]);

        network.go_offline();
        assert_eq!(respond(&worker, get("/rest/v1/products")).await.body, "[1]");

        let offline = respond(&worker, post).await;
        assert_eq!(offline.status, StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_slice(&offline.body).unwrap();
        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_api_error_status_not_cached() {
        let network = seeded_network();
        let worker = active_worker(&network).await;

        let response = respond(&worker, get("/api/unknown")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(worker.storage().open(&worker.names().dynamic).is_empty());
    }

    #[tokio::test]
    async fn test_sweep_expired_images() {
        let network = seeded_network();
        let worker = active_worker(&network).await;
        let now = Utc::now();

        let mut old = ok("image/png", "old");
        old.headers.insert(
            header::DATE,
            HeaderValue::from_str(&format_http_date(now - TimeDelta::days(8))).unwrap(),
        );
        network.serve("/old.png", old);
        respond(&worker, get("/old.png")).await;

        let report = worker.sweep_expired_images(now).await;
        assert_eq!(report.deleted, 1);
        assert!(worker.storage().open(&worker.names().images).is_empty());
    }

    #[tokio::test]
    async fn test_worker_as_fetcher_forwards_passthrough() {
        let network = seeded_network();
        let worker = CacheWorker::new(config(), Arc::clone(&network), CacheStorage::new(100));

        let response = worker.fetch(get("/manifest.json")).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(network.hits(), 1);
    }

    #[test]
    fn test_side_channels() {
        let worker = CacheWorker::new(config(), seeded_network(), CacheStorage::new(1));

        assert_eq!(worker.handle_sync(BACKGROUND_SYNC_TAG), SyncOutcome::Completed);
        assert_eq!(worker.handle_sync("other"), SyncOutcome::Ignored);

        let notification = worker.handle_push(br#"{"title": "Back in stock", "url": "/products/mug"}"#);
        assert_eq!(notification.title, "Back in stock");
        assert_eq!(
            worker.handle_notification_click(&notification),
            ClientAction::OpenWindow {
                url: "https://shop.test/products/mug".to_string()
            }
        );
    }
}
