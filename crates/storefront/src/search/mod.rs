//! Product search.
//!
//! [`SearchCoordinator`] turns rapid, conflicting user input into a minimal,
//! correctly ordered sequence of backend queries. The backend is any
//! [`SearchBackend`]; [`HttpSearchBackend`] is the hosted one.

pub mod backend;
mod coordinator;

pub use backend::{BackendError, HttpSearchBackend, SearchBackend};
pub use coordinator::{SearchCoordinator, SearchSnapshot, SearchStatus};
