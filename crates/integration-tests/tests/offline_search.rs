//! Search coordinator running over the caching worker.
//!
//! The backend is reached through [`CacheWorker`] as a [`Fetcher`], so search
//! responses land in the dynamic namespace and are replayed when the network
//! drops.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bazaar_core::{SearchFilters, SearchSort};
use bazaar_integration_tests::{FakeNetwork, backend_config, search_page, worker_config};
use bazaar_storefront::config::SearchConfig;
use bazaar_storefront::search::{HttpSearchBackend, SearchCoordinator, SearchStatus};
use bazaar_storefront::worker::{CacheStorage, CacheWorker};

const SEARCH_PATH: &str = "/api/search";

type Coordinator = SearchCoordinator<HttpSearchBackend<CacheWorker<FakeNetwork>>>;

async fn active_worker(network: &FakeNetwork) -> CacheWorker<FakeNetwork> {
    let worker = CacheWorker::new(worker_config(), network.clone(), CacheStorage::new(100));
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
}

fn coordinator(worker: CacheWorker<FakeNetwork>) -> Coordinator {
    let config = SearchConfig {
        debounce: Duration::ZERO,
        page_size: 2,
        error_message: "Search is unavailable".to_string(),
    };
    SearchCoordinator::new(HttpSearchBackend::new(worker, backend_config()), config)
}

// =============================================================================
// Online
// =============================================================================

#[tokio::test]
async fn test_search_through_worker_populates_dynamic_cache() {
    let network = FakeNetwork::with_storefront_assets();
    network.serve(SEARCH_PATH, search_page(&["a", "b"], 1, true));
    let worker = active_worker(&network).await;
    let coordinator = coordinator(worker.clone());

    coordinator.search("lamp", SearchFilters::default(), SearchSort::Relevance);
    let snapshot = coordinator.settled().await;

    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(snapshot.result.products.len(), 2);
    assert_eq!(snapshot.query(), "lamp");

    let dynamic = worker.storage().open(&worker.names().dynamic);
    assert_eq!(dynamic.len(), 1);
    assert!(
        dynamic
            .keys()
            .iter()
            .all(|key| key.starts_with("GET ") && key.contains("/api/search?q=lamp"))
    );
}

#[tokio::test]
async fn test_load_more_appends_second_page() {
    let network = FakeNetwork::with_storefront_assets();
    network.serve(SEARCH_PATH, search_page(&["a", "b"], 1, true));
    let coordinator = coordinator(active_worker(&network).await);

    coordinator.search("lamp", SearchFilters::default(), SearchSort::PriceAsc);
    coordinator.settled().await;

    network.serve(SEARCH_PATH, search_page(&["c", "d"], 2, false));
    assert!(coordinator.load_more());
    let snapshot = coordinator.settled().await;

    let ids: Vec<_> = snapshot
        .result
        .products
        .iter()
        .map(|p| p.id.as_str().to_string())
        .collect();
    assert_eq!(ids, ["a", "b", "c", "d"]);
    assert_eq!(snapshot.result.page, 2);
    assert!(!snapshot.result.has_more);
    assert!(!coordinator.load_more());
}

// =============================================================================
// Offline
// =============================================================================

#[tokio::test]
async fn test_offline_search_replays_cached_page() {
    let network = FakeNetwork::with_storefront_assets();
    network.serve(SEARCH_PATH, search_page(&["a", "b"], 1, true));
    let worker = active_worker(&network).await;

    let first = coordinator(worker.clone());
    first.search("lamp", SearchFilters::default(), SearchSort::Relevance);
    let online = first.settled().await;
    drop(first);

    network.go_offline();
    let second = coordinator(worker);
    second.search("lamp", SearchFilters::default(), SearchSort::Relevance);
    let offline = second.settled().await;

    assert_eq!(offline.status, SearchStatus::Ready);
    assert_eq!(offline.result, online.result);
}

#[tokio::test]
async fn test_offline_search_without_cache_reports_error() {
    let network = FakeNetwork::with_storefront_assets();
    let coordinator = coordinator(active_worker(&network).await);
    network.go_offline();

    coordinator.search("never seen", SearchFilters::default(), SearchSort::Relevance);
    let snapshot = coordinator.settled().await;

    assert_eq!(snapshot.status, SearchStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some("Search is unavailable"));
    assert!(snapshot.result.is_empty());
}

#[tokio::test]
async fn test_offline_load_more_keeps_loaded_pages() {
    let network = FakeNetwork::with_storefront_assets();
    network.serve(SEARCH_PATH, search_page(&["a", "b"], 1, true));
    let coordinator = coordinator(active_worker(&network).await);

    coordinator.search("lamp", SearchFilters::default(), SearchSort::Relevance);
    coordinator.settled().await;

    network.go_offline();
    assert!(coordinator.load_more());
    let snapshot = coordinator.settled().await;

    assert_eq!(snapshot.status, SearchStatus::Error);
    assert_eq!(snapshot.result.products.len(), 2);
}

#[tokio::test]
async fn test_retry_succeeds_after_reconnect() {
    let network = FakeNetwork::with_storefront_assets();
    network.serve(SEARCH_PATH, search_page(&["a"], 1, false));
    let coordinator = coordinator(active_worker(&network).await);
    network.go_offline();

    let filters = SearchFilters::default().with_category("lighting");
    coordinator.search("", filters, SearchSort::Relevance);
    assert_eq!(coordinator.settled().await.status, SearchStatus::Error);

    network.go_online();
    assert!(coordinator.retry());
    let snapshot = coordinator.settled().await;

    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(snapshot.result.products.len(), 1);
    assert!(snapshot.filters.categories.contains("lighting"));
}
