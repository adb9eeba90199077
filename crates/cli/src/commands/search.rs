//! One-shot search.

use std::time::Duration;

use bazaar_storefront::config::SearchConfig;
use bazaar_storefront::search::{SearchCoordinator, SearchSnapshot, SearchStatus};
use clap::Args;
use tracing::{debug, info};

use super::{CliError, FilterArgs, backend};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Pages to load, including the first
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Run the search to settlement, load further pages and print the result.
///
/// # Errors
///
/// Returns an error if the backend cannot be built or a page fails to load.
pub async fn run(args: SearchArgs) -> Result<(), CliError> {
    let filters = args.filters.filters()?;
    let sort = args.filters.sort();

    let config = SearchConfig {
        debounce: Duration::ZERO,
        ..SearchConfig::from_env()?
    };
    let coordinator = SearchCoordinator::new(backend(args.filters.offline_cache).await?, config);

    coordinator.search(args.query, filters, sort);
    let mut snapshot = check(coordinator.settled().await)?;

    let mut loaded = 1;
    while loaded < args.pages && coordinator.load_more() {
        snapshot = check(coordinator.settled().await)?;
        loaded += 1;
        debug!(page = loaded, products = snapshot.result.products.len(), "Page loaded");
    }

    info!(
        products = snapshot.result.products.len(),
        total = snapshot.result.total_count,
        pages = loaded,
        "Search complete"
    );

    let output = serde_json::to_string_pretty(&snapshot.result)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }

    Ok(())
}

fn check(snapshot: SearchSnapshot) -> Result<SearchSnapshot, CliError> {
    match snapshot.status {
        SearchStatus::Error => Err(CliError::Search(
            snapshot.error.unwrap_or_else(|| "unknown error".to_string()),
        )),
        _ => Ok(snapshot),
    }
}
