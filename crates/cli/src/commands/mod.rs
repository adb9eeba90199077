//! Command implementations and shared argument handling.

pub mod search;
pub mod watch;

use bazaar_core::{PriceRange, PriceRangeError, SearchFilters, SearchRequest, SearchResult, SearchSort};
use bazaar_storefront::config::{ConfigError, SearchBackendConfig, WorkerConfig};
use bazaar_storefront::fetch::{HttpFetcher, NetworkError};
use bazaar_storefront::search::{BackendError, HttpSearchBackend, SearchBackend};
use bazaar_storefront::worker::{CacheStorage, CacheWorker, WorkerError};
use clap::Args;
use thiserror::Error;
use tracing::info;

/// Entries kept per namespace by the in-process worker.
const OFFLINE_CACHE_CAPACITY: u64 = 500;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Network(#[from] NetworkError),

    #[error("Caching worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Invalid price range: {0}")]
    Price(#[from] PriceRangeError),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Filter and transport flags shared by every command.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Category filter (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Brand filter (repeatable)
    #[arg(long = "brand")]
    pub brands: Vec<String>,

    /// Minimum price in minor units
    #[arg(long)]
    pub min_price: Option<u64>,

    /// Maximum price in minor units
    #[arg(long)]
    pub max_price: Option<u64>,

    /// Minimum average rating
    #[arg(long)]
    pub rating: Option<f32>,

    /// Only products with free shipping
    #[arg(long)]
    pub free_shipping: bool,

    /// Only products in stock
    #[arg(long)]
    pub in_stock: bool,

    /// Seller location filter (repeatable)
    #[arg(long)]
    pub location: Vec<String>,

    /// Sort order (relevance, price-asc, price-desc, rating, newest, best-selling)
    #[arg(long, default_value = "relevance")]
    pub sort: String,

    /// Route backend requests through an in-process caching worker.
    ///
    /// The cache lives only as long as the process, so replays help within
    /// one `watch` session (or across pages of one `search`), never across runs.
    #[arg(long)]
    pub offline_cache: bool,
}

impl FilterArgs {
    /// Filters for these flags with an empty query.
    ///
    /// # Errors
    ///
    /// Returns an error if the price bounds are inverted.
    pub fn filters(&self) -> Result<SearchFilters, CliError> {
        let defaults = PriceRange::default();
        let price_range = PriceRange::new(
            self.min_price.unwrap_or(defaults.min),
            self.max_price.unwrap_or(defaults.max),
        )?;

        Ok(SearchFilters {
            query: String::new(),
            categories: self.categories.iter().cloned().collect(),
            brands: self.brands.iter().cloned().collect(),
            price_range,
            rating: self.rating.unwrap_or(0.0),
            free_shipping: self.free_shipping,
            in_stock: self.in_stock,
            location: self.location.iter().cloned().collect(),
        })
    }

    /// Parsed sort order.
    #[must_use]
    pub fn sort(&self) -> SearchSort {
        SearchSort::parse(&self.sort)
    }
}

/// Search backend used by the CLI: direct, or behind the caching worker.
pub enum CliBackend {
    Direct(HttpSearchBackend<HttpFetcher>),
    Cached(HttpSearchBackend<CacheWorker<HttpFetcher>>),
}

impl SearchBackend for CliBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, BackendError> {
        match self {
            Self::Direct(backend) => backend.search(request).await,
            Self::Cached(backend) => backend.search(request).await,
        }
    }
}

/// Build the backend from the environment.
///
/// With `offline_cache`, every backend request is treated as an API request:
/// successful GETs are cached and replayed when the network fails. The cache
/// storage is created here and is not persisted.
///
/// # Errors
///
/// Returns an error if configuration is missing or the worker fails to start.
pub async fn backend(offline_cache: bool) -> Result<CliBackend, CliError> {
    let config = SearchBackendConfig::from_env()?;
    let network = HttpFetcher::new(config.timeout)?;

    if !offline_cache {
        return Ok(CliBackend::Direct(HttpSearchBackend::new(network, config)));
    }

    let mut worker_config = WorkerConfig::new(config.base_url.clone());
    worker_config.static_manifest.clear();
    worker_config.shell_path.clear();
    worker_config.api_markers = vec![config.base_url.path().to_string()];

    let worker = CacheWorker::new(
        worker_config,
        network,
        CacheStorage::new(OFFLINE_CACHE_CAPACITY),
    );
    worker.install().await?;
    worker.activate().await?;
    info!("Offline cache enabled");

    Ok(CliBackend::Cached(HttpSearchBackend::new(worker, config)))
}
