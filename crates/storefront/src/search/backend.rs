//! HTTP client for the hosted search backend.

use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use bazaar_core::{SearchRequest, SearchResult};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::SearchBackendConfig;
use crate::fetch::{FetchRequest, Fetcher, HttpFetcher, NetworkError};

/// Maximum number of body bytes kept in a [`BackendError::Status`].
const MAX_ERROR_BODY: usize = 512;

static APIKEY_HEADER: HeaderName = HeaderName::from_static("apikey");

/// Errors from the search backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("search request failed: {0}")]
    Network(#[from] NetworkError),

    #[error("search backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

/// Something that can answer a [`SearchRequest`].
pub trait SearchBackend: Send + Sync + 'static {
    /// Run one page of a search.
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchResult, BackendError>> + Send;
}

impl<T: SearchBackend> SearchBackend for Arc<T> {
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchResult, BackendError>> + Send {
        T::search(self, request)
    }
}

/// Search backend reached over HTTP.
///
/// Generic over the [`Fetcher`] so the same client runs directly against the
/// network or through the caching worker.
#[derive(Debug, Clone)]
pub struct HttpSearchBackend<F> {
    fetcher: F,
    config: SearchBackendConfig,
}

impl HttpSearchBackend<HttpFetcher> {
    /// Create a backend that talks to the network directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: SearchBackendConfig) -> Result<Self, NetworkError> {
        let fetcher = HttpFetcher::new(config.timeout)?;
        Ok(Self::new(fetcher, config))
    }
}

impl<F: Fetcher> HttpSearchBackend<F> {
    /// Create a backend over an arbitrary fetcher.
    #[must_use]
    pub const fn new(fetcher: F, config: SearchBackendConfig) -> Self {
        Self { fetcher, config }
    }

    /// The underlying fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Build the `GET {base}/search?...` URL for a request.
    ///
    /// Only filters that narrow the result set are sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be joined.
    pub fn search_url(&self, request: &SearchRequest) -> Result<Url, BackendError> {
        let filters = &request.filters;
        let mut url = self.config.base_url.join("search")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", filters.query.trim());
            if !filters.categories.is_empty() {
                pairs.append_pair("categories", &join(&filters.categories));
            }
            if !filters.brands.is_empty() {
                pairs.append_pair("brands", &join(&filters.brands));
            }
            if filters.price_range.is_active() {
                pairs.append_pair("min_price", &filters.price_range.min.to_string());
                pairs.append_pair("max_price", &filters.price_range.max.to_string());
            }
            if filters.rating > 0.0 {
                pairs.append_pair("rating", &filters.rating.to_string());
            }
            if filters.free_shipping {
                pairs.append_pair("free_shipping", "true");
            }
            if filters.in_stock {
                pairs.append_pair("in_stock", "true");
            }
            if !filters.location.is_empty() {
                pairs.append_pair("location", &join(&filters.location));
            }
            pairs.append_pair("sort", request.sort.as_str());
            pairs.append_pair("page", &request.page.to_string());
            pairs.append_pair("limit", &request.limit.to_string());
        }
        Ok(url)
    }

    fn build_request(&self, request: &SearchRequest) -> Result<FetchRequest, BackendError> {
        let key = self.config.api_key.expose_secret();

        let mut apikey = HeaderValue::from_str(key).map_err(|_| BackendError::InvalidApiKey)?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| BackendError::InvalidApiKey)?;
        bearer.set_sensitive(true);

        Ok(FetchRequest::get(self.search_url(request)?)
            .with_header(APIKEY_HEADER.clone(), apikey)
            .with_header(header::AUTHORIZATION, bearer)
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json")))
    }
}

impl<F: Fetcher> SearchBackend for HttpSearchBackend<F> {
    #[instrument(skip_all, fields(query = %request.filters.query, page = request.page))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult, BackendError> {
        let fetch = self.build_request(request)?;
        let response = self.fetcher.fetch(fetch).await?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body)
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(BackendError::Status {
                status: response.status,
                body,
            });
        }

        let mut result: SearchResult = serde_json::from_slice(&response.body)?;
        if result.page == 0 {
            result.page = request.page;
        }
        debug!(
            products = result.products.len(),
            total = result.total_count,
            has_more = result.has_more,
            "Search page received"
        );
        Ok(result)
    }
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
