//! Debounced, cancellable, paginated search.
//!
//! Every request carries a staleness token: the generation number it was
//! issued under and a cancellation token. A completion is applied only while
//! both are still current, so results land in issuance order no matter when
//! they arrive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bazaar_core::{SearchFilters, SearchRequest, SearchResult, SearchSort};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backend::SearchBackend;
use crate::config::SearchConfig;

/// Where the coordinator is in its request cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStatus {
    #[default]
    Idle,
    Debouncing,
    Loading,
    LoadingMore,
    Error,
    Ready,
}

impl SearchStatus {
    /// A request is being fetched.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }

    /// Nothing is scheduled or in flight.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Debouncing | Self::Loading | Self::LoadingMore)
    }
}

/// The view a UI renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub status: SearchStatus,
    /// Current filters, including the free-text query.
    pub filters: SearchFilters,
    pub sort: SearchSort,
    pub result: SearchResult,
    /// User-facing message, set only in [`SearchStatus::Error`].
    pub error: Option<String>,
}

impl SearchSnapshot {
    /// The free-text query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.filters.query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Fresh,
    More,
}

/// Coordinates search requests against a [`SearchBackend`].
///
/// Must be used from within a Tokio runtime. Dropping the coordinator cancels
/// any pending debounce and in-flight request.
pub struct SearchCoordinator<B: SearchBackend> {
    shared: Arc<Shared<B>>,
}

struct Shared<B> {
    backend: B,
    config: SearchConfig,
    root: CancellationToken,
    inner: Mutex<Inner>,
    view: watch::Sender<SearchSnapshot>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    cancel: CancellationToken,
    /// Cache key of the request currently on the wire.
    in_flight: Option<String>,
    /// Page-1 request of the latest fresh search.
    last_request: Option<SearchRequest>,
    /// Request for the last page that loaded.
    current_request: Option<SearchRequest>,
    view: SearchSnapshot,
}

impl Inner {
    /// Cancel whatever is pending and start a new generation.
    fn supersede(&mut self, root: &CancellationToken) -> (u64, CancellationToken) {
        self.cancel.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.cancel = root.child_token();
        self.in_flight = None;
        (self.generation, self.cancel.clone())
    }

    fn is_current(&self, generation: u64, token: &CancellationToken) -> bool {
        self.generation == generation && !token.is_cancelled()
    }
}

impl<B: SearchBackend> Shared<B> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.view.send_replace(inner.view.clone());
    }
}

impl<B: SearchBackend> SearchCoordinator<B> {
    /// Create a coordinator.
    pub fn new(backend: B, config: SearchConfig) -> Self {
        let (view, _) = watch::channel(SearchSnapshot::default());
        let root = CancellationToken::new();
        let inner = Inner {
            cancel: root.child_token(),
            ..Inner::default()
        };

        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                root,
                inner: Mutex::new(inner),
                view,
            }),
        }
    }

    /// Schedule a search after the debounce interval.
    ///
    /// Cancels any pending debounce and in-flight request. The query and
    /// filters are published immediately. A call identical to the request
    /// currently in flight is ignored.
    pub fn search(&self, query: impl Into<String>, filters: SearchFilters, sort: SearchSort) {
        let shared = &self.shared;
        if shared.root.is_cancelled() {
            return;
        }

        let filters = filters.with_query(query);
        let request = SearchRequest::first_page(filters.clone(), sort, shared.config.page_size);

        let mut inner = shared.lock();
        if inner.view.status == SearchStatus::Loading
            && inner.in_flight.as_deref() == Some(request.cache_key().as_str())
        {
            debug!(query = %filters.query, "Identical search already in flight");
            return;
        }

        let (generation, token) = inner.supersede(&shared.root);
        inner.last_request = Some(request.clone());
        inner.view.status = SearchStatus::Debouncing;
        inner.view.filters = filters;
        inner.view.sort = sort;
        inner.view.error = None;
        shared.publish(&inner);
        drop(inner);

        debug!(generation, "Search scheduled");
        tokio::spawn(run(
            Arc::clone(shared),
            generation,
            token,
            request,
            RequestKind::Fresh,
            Some(shared.config.debounce),
        ));
    }

    /// Fetch the next page and append it.
    ///
    /// Only valid from [`SearchStatus::Ready`] when more results exist.
    /// Returns whether a request was issued.
    pub fn load_more(&self) -> bool {
        let shared = &self.shared;
        if shared.root.is_cancelled() {
            return false;
        }

        let mut inner = shared.lock();
        if inner.view.status != SearchStatus::Ready || !inner.view.result.has_more {
            return false;
        }
        let Some(request) = inner.current_request.as_ref().map(SearchRequest::next_page) else {
            return false;
        };

        let (generation, token) = inner.supersede(&shared.root);
        inner.in_flight = Some(request.cache_key());
        inner.view.status = SearchStatus::LoadingMore;
        inner.view.error = None;
        shared.publish(&inner);
        drop(inner);

        debug!(generation, page = request.page, "Loading next page");
        tokio::spawn(run(
            Arc::clone(shared),
            generation,
            token,
            request,
            RequestKind::More,
            None,
        ));
        true
    }

    /// Re-run the last fresh search immediately.
    ///
    /// Skipped when the last search had neither a query nor an active filter.
    /// Returns whether a search was issued.
    pub fn retry(&self) -> bool {
        let shared = &self.shared;
        if shared.root.is_cancelled() {
            return false;
        }

        let mut inner = shared.lock();
        let Some(request) = inner
            .last_request
            .clone()
            .filter(|r| r.filters.has_search_parameters())
        else {
            return false;
        };

        let (generation, token) = inner.supersede(&shared.root);
        inner.in_flight = Some(request.cache_key());
        inner.view.status = SearchStatus::Loading;
        inner.view.filters = request.filters.clone();
        inner.view.sort = request.sort;
        inner.view.error = None;
        shared.publish(&inner);
        drop(inner);

        debug!(generation, "Retrying search");
        tokio::spawn(run(
            Arc::clone(shared),
            generation,
            token,
            request,
            RequestKind::Fresh,
            None,
        ));
        true
    }

    /// Cancel everything and return to [`SearchStatus::Idle`] with empty state.
    pub fn reset(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        inner.supersede(&shared.root);
        inner.last_request = None;
        inner.current_request = None;
        inner.view = SearchSnapshot::default();
        shared.publish(&inner);
    }

    /// Cancel pending work; later calls become no-ops.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        shared.root.cancel();

        let mut inner = shared.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.in_flight = None;
        if !inner.view.status.is_settled() {
            inner.view.status = SearchStatus::Idle;
        }
        shared.publish(&inner);
    }

    /// Current view.
    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.view.borrow().clone()
    }

    /// Receive every published view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.shared.view.subscribe()
    }

    /// Wait until nothing is scheduled or in flight.
    pub async fn settled(&self) -> SearchSnapshot {
        let mut rx = self.shared.view.subscribe();
        match rx.wait_for(|s| s.status.is_settled()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }
}

impl<B: SearchBackend> Drop for SearchCoordinator<B> {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}

async fn run<B: SearchBackend>(
    shared: Arc<Shared<B>>,
    generation: u64,
    token: CancellationToken,
    request: SearchRequest,
    kind: RequestKind,
    debounce: Option<Duration>,
) {
    if let Some(delay) = debounce {
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }

        let mut inner = shared.lock();
        if !inner.is_current(generation, &token) {
            return;
        }
        inner.in_flight = Some(request.cache_key());
        inner.view.status = SearchStatus::Loading;
        shared.publish(&inner);
    }

    debug!(generation, page = request.page, "Search request issued");
    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => {
            debug!(generation, "Search request cancelled");
            return;
        }
        outcome = shared.backend.search(&request) => outcome,
    };

    let mut inner = shared.lock();
    if !inner.is_current(generation, &token) {
        debug!(generation, "Dropping stale search response");
        return;
    }
    inner.in_flight = None;

    match (kind, outcome) {
        (RequestKind::Fresh, Ok(result)) => {
            inner.view.result = result;
            inner.view.status = SearchStatus::Ready;
            inner.current_request = Some(request);
        }
        (RequestKind::More, Ok(page)) => {
            inner.view.result.append_page(page);
            inner.view.status = SearchStatus::Ready;
            inner.current_request = Some(request);
        }
        (kind, Err(error)) => {
            warn!(generation, error = %error, page = request.page, "Search failed");
            if kind == RequestKind::Fresh {
                inner.view.result = SearchResult::default();
            }
            inner.view.status = SearchStatus::Error;
            inner.view.error = Some(shared.config.error_message.clone());
        }
    }
    shared.publish(&inner);
}
