//! Bazaar Core - Shared types library.
//!
//! This crate provides the catalog and search types used across all Bazaar
//! components:
//! - `storefront` - Search coordinator, caching worker and edge proxy
//! - `cli` - Command-line search tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Products, search filters, sort orders, requests and result pages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
