//! Bazaar storefront library.
//!
//! This crate holds the client-side state machines of the storefront:
//!
//! - [`search::SearchCoordinator`]: debounced, cancellable, paginated product search
//! - [`worker::CacheWorker`]: request interception with per-resource caching
//!   strategies and age-based image eviction
//!
//! plus the edge proxy that hosts the worker in front of the upstream origin.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod state;
pub mod worker;
