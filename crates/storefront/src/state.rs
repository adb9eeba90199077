//! Application state shared across handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::StorefrontConfig;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::worker::{CacheStorage, CacheWorker};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// caching worker and configuration.
pub struct AppState<F = HttpFetcher> {
    inner: Arc<AppStateInner<F>>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<F> {
    config: StorefrontConfig,
    worker: CacheWorker<F>,
    shutdown: CancellationToken,
}

impl<F: Fetcher> AppState<F> {
    /// Create a new application state.
    ///
    /// The worker is created with a fresh cache store sized from the config.
    #[must_use]
    pub fn new(config: StorefrontConfig, network: F) -> Self {
        let storage = CacheStorage::new(config.worker.cache_capacity);
        let worker = CacheWorker::new(config.worker.clone(), network, storage);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                worker,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the caching worker.
    #[must_use]
    pub fn worker(&self) -> &CacheWorker<F> {
        &self.inner.worker
    }

    /// Token cancelled on shutdown; long-lived streams and tasks watch it.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }
}
