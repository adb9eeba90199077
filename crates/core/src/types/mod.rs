//! Core types for Bazaar.
//!
//! This module provides the catalog and search domain model.

pub mod price;
pub mod product;
pub mod search;

pub use price::{DEFAULT_MAX_PRICE, PriceRange, PriceRangeError};
pub use product::{Product, ProductId};
pub use search::{SearchFilters, SearchRequest, SearchResult, SearchSort};
