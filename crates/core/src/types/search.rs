//! Search parameters and result pages.
//!
//! A [`SearchFilters`] value is immutable per search: a new value replaces the
//! previous one entirely. Call sites derive new values with the `with_*`
//! helpers instead of mutating shared state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::price::PriceRange;
use super::product::Product;

/// Product search filters.
///
/// Sets are ordered so that two equal filter values always serialize to the
/// same string (see [`SearchRequest::cache_key`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub brands: BTreeSet<String>,
    #[serde(default)]
    pub price_range: PriceRange,
    /// Minimum average rating (0 disables the filter).
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub location: BTreeSet<String>,
}

impl SearchFilters {
    /// Whether any filter other than the free-text query is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.categories.is_empty()
            || !self.brands.is_empty()
            || self.price_range.is_active()
            || self.rating > 0.0
            || self.free_shipping
            || self.in_stock
            || !self.location.is_empty()
    }

    /// Whether a search with these filters differs from the default listing.
    #[must_use]
    pub fn has_search_parameters(&self) -> bool {
        !self.query.trim().is_empty() || self.is_active()
    }

    /// Copy with a different query.
    #[must_use]
    pub fn with_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }

    /// Copy with an additional category.
    #[must_use]
    pub fn with_category(&self, category: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.categories.insert(category.into());
        next
    }

    /// Copy with an additional brand.
    #[must_use]
    pub fn with_brand(&self, brand: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.brands.insert(brand.into());
        next
    }

    /// Copy with a different price range.
    #[must_use]
    pub fn with_price_range(&self, price_range: PriceRange) -> Self {
        Self {
            price_range,
            ..self.clone()
        }
    }

    /// Copy with a minimum rating.
    #[must_use]
    pub fn with_rating(&self, rating: f32) -> Self {
        Self {
            rating,
            ..self.clone()
        }
    }
}

/// Search sort order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchSort {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
    BestSelling,
}

impl SearchSort {
    /// Parse from a URL or CLI value. Unknown values fall back to relevance.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price-asc" | "price_asc" | "price-ascending" => Self::PriceAsc,
            "price-desc" | "price_desc" | "price-descending" => Self::PriceDesc,
            "rating" | "top-rated" => Self::Rating,
            "newest" | "created-desc" => Self::Newest,
            "best-selling" | "best_selling" | "popular" => Self::BestSelling,
            _ => Self::Relevance,
        }
    }

    /// Wire value sent to the search backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Rating => "rating",
            Self::Newest => "newest",
            Self::BestSelling => "best-selling",
        }
    }
}

/// One backend query: filters, sort and the page window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub filters: SearchFilters,
    pub sort: SearchSort,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl SearchRequest {
    /// Request for the first page.
    #[must_use]
    pub const fn first_page(filters: SearchFilters, sort: SearchSort, limit: u32) -> Self {
        Self {
            filters,
            sort,
            page: 1,
            limit,
        }
    }

    /// Same query, filters and sort for the following page.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Deterministic key over `(query, filters, sort, page)`.
    ///
    /// Used to recognise a request that is already in flight. It is not a
    /// response cache key.
    #[must_use]
    pub fn cache_key(&self) -> String {
        serde_json::json!({
            "query": self.filters.query.trim(),
            "filters": {
                "categories": self.filters.categories,
                "brands": self.filters.brands,
                "priceRange": [self.filters.price_range.min, self.filters.price_range.max],
                "rating": self.filters.rating,
                "freeShipping": self.filters.free_shipping,
                "inStock": self.filters.in_stock,
                "location": self.filters.location,
            },
            "sort": self.sort.as_str(),
            "page": self.page,
        })
        .to_string()
    }
}

/// A page (or an accumulation of pages) of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub has_more: bool,
    /// Last loaded page; 0 when nothing has been loaded.
    #[serde(default)]
    pub page: u32,
}

impl SearchResult {
    /// Append the next page, keeping existing products first.
    pub fn append_page(&mut self, next: Self) {
        self.products.extend(next.products);
        self.total_count = next.total_count;
        self.has_more = next.has_more;
        self.page = next.page;
    }

    /// Check if there are any results.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(ids: &[&str], page: u32, has_more: bool) -> SearchResult {
        SearchResult {
            products: ids.iter().map(|id| Product::new(*id, *id, 100)).collect(),
            total_count: 4,
            has_more,
            page,
        }
    }

    #[test]
    fn test_sort_parse_aliases() {
        assert_eq!(SearchSort::parse("price_asc"), SearchSort::PriceAsc);
        assert_eq!(SearchSort::parse("price-descending"), SearchSort::PriceDesc);
        assert_eq!(SearchSort::parse("popular"), SearchSort::BestSelling);
        assert_eq!(SearchSort::parse("whatever"), SearchSort::Relevance);
        assert_eq!(SearchSort::parse(SearchSort::Newest.as_str()), SearchSort::Newest);
    }

    #[test]
    fn test_sort_serializes_as_wire_value() {
        let json = serde_json::to_string(&SearchSort::BestSelling).unwrap();
        assert_eq!(json, "\"best-selling\"");
    }

    #[test]
    fn test_filters_active() {
        let filters = SearchFilters::default();
        assert!(!filters.is_active());
        assert!(!filters.has_search_parameters());

        assert!(!filters.with_query("  ").has_search_parameters());
        assert!(filters.with_query("shoes").has_search_parameters());
        assert!(!filters.with_query("shoes").is_active());
        assert!(filters.with_brand("acme").is_active());
        assert!(filters.with_rating(4.0).is_active());
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = SearchFilters::default()
            .with_category("shoes")
            .with_category("bags");
        let b = SearchFilters::default()
            .with_category("bags")
            .with_category("shoes");

        let ra = SearchRequest::first_page(a, SearchSort::Rating, 20);
        let rb = SearchRequest::first_page(b, SearchSort::Rating, 20);
        assert_eq!(ra.cache_key(), rb.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_page_and_sort() {
        let request = SearchRequest::first_page(
            SearchFilters::default().with_query("lamp"),
            SearchSort::Relevance,
            20,
        );
        assert_ne!(request.cache_key(), request.next_page().cache_key());

        let sorted = SearchRequest {
            sort: SearchSort::PriceAsc,
            ..request.clone()
        };
        assert_ne!(request.cache_key(), sorted.cache_key());
    }

    #[test]
    fn test_next_page_keeps_parameters() {
        let request = SearchRequest::first_page(
            SearchFilters::default().with_query("desk"),
            SearchSort::Newest,
            12,
        );
        let next = request.next_page();
        assert_eq!(next.page, 2);
        assert_eq!(next.filters, request.filters);
        assert_eq!(next.sort, request.sort);
        assert_eq!(next.limit, 12);
    }

    #[test]
    fn test_append_page_preserves_order() {
        let mut result = page(&["p1", "p2"], 1, true);
        result.append_page(page(&["p3", "p4"], 2, false));

        let ids: Vec<&str> = result.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2", "p3", "p4"]);
        assert_eq!(result.page, 2);
        assert!(!result.has_more);
    }

    #[test]
    fn test_result_deserializes_backend_shape() {
        let json = r#"{"products": [], "totalCount": 42, "hasMore": true, "page": 3}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.total_count, 42);
        assert!(result.has_more);
        assert_eq!(result.page, 3);
    }
}
