//! Bazaar CLI - product search from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # One-shot search, three pages, printed as JSON
//! bazaar search --query "linen shirt" --category shirts --max-price 5000 --pages 3
//!
//! # Interactive search through an in-process caching worker; queries seen
//! # earlier in the session are replayed if the network drops
//! bazaar watch --offline-cache
//!
//! # Interactive: each stdin line is a new query
//! bazaar watch --sort price-asc
//! ```
//!
//! # Commands
//!
//! - `search` - Run one search to completion and print the accumulated result
//! - `watch` - Debounced search over stdin lines, printing every settled view
//!
//! # Environment Variables
//!
//! - `SEARCH_API_URL` - Search backend base URL
//! - `SEARCH_API_KEY` - Search backend API key
//! - `SEARCH_DEBOUNCE_MS`, `SEARCH_PAGE_SIZE`, `SEARCH_ERROR_MESSAGE` - Coordinator tuning

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CliError, search::SearchArgs, watch::WatchArgs};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar product search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search and print the result as JSON
    Search(SearchArgs),
    /// Read queries from stdin and print each settled result
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "bazaar_storefront=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Search(args) => commands::search::run(args).await,
        Commands::Watch(args) => commands::watch::run(args).await,
    }
}
