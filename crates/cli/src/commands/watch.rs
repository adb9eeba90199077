//! Interactive search over stdin.
//!
//! Each line is a new query. Lines starting with `:` are commands:
//! `:more` loads the next page, `:retry` repeats the last search and
//! `:reset` clears everything.

use bazaar_storefront::config::SearchConfig;
use bazaar_storefront::search::{SearchCoordinator, SearchSnapshot, SearchStatus};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{CliError, FilterArgs, backend};

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
}

/// A parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Query(&'a str),
    More,
    Retry,
    Reset,
    Unknown(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.strip_prefix(':') {
            Some("more") => Self::More,
            Some("retry") => Self::Retry,
            Some("reset") => Self::Reset,
            Some(other) => Self::Unknown(other),
            None => Self::Query(line),
        }
    }
}

/// Feed stdin lines to the coordinator until EOF.
///
/// # Errors
///
/// Returns an error if the backend cannot be built or stdin fails.
pub async fn run(args: WatchArgs) -> Result<(), CliError> {
    let filters = args.filters.filters()?;
    let sort = args.filters.sort();

    let coordinator = SearchCoordinator::new(
        backend(args.filters.offline_cache).await?,
        SearchConfig::from_env()?,
    );
    let printer = tokio::spawn(print_settled(coordinator.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Query(query) => coordinator.search(query, filters.clone(), sort),
            Input::More => {
                if !coordinator.load_more() {
                    debug!("No more results to load");
                }
            }
            Input::Retry => {
                if !coordinator.retry() {
                    debug!("Nothing to retry");
                }
            }
            Input::Reset => coordinator.reset(),
            Input::Unknown(command) => warn!(command, "Unknown command"),
        }
    }

    coordinator.settled().await;
    coordinator.shutdown();
    drop(coordinator);

    if let Err(e) = printer.await {
        warn!(error = %e, "Printer task ended abnormally");
    }
    Ok(())
}

/// Print every distinct settled, non-idle view until the coordinator is gone.
async fn print_settled(mut rx: watch::Receiver<SearchSnapshot>) {
    let mut last: Option<SearchSnapshot> = None;

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if !snapshot.status.is_settled() || snapshot.status == SearchStatus::Idle {
            continue;
        }
        if last.as_ref() == Some(&snapshot) {
            continue;
        }

        match serde_json::to_string(&snapshot) {
            #[allow(clippy::print_stdout)]
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
        }
        last = Some(snapshot);
    }
}
