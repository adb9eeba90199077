//! Bazaar storefront edge proxy.
//!
//! This binary serves the storefront on port 3000 by proxying the upstream
//! origin (the hosted client-rendered app and its backend) through the
//! caching worker.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Caching worker with four versioned `moka` namespaces
//! - Background image eviction every 24 hours
//! - Worker events streamed to clients over SSE

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::fetch::HttpFetcher;
use bazaar_storefront::routes;
use bazaar_storefront::state::AppState;
use bazaar_storefront::worker::spawn_eviction_task;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Timeout for upstream requests.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let network = HttpFetcher::new(UPSTREAM_TIMEOUT).expect("Failed to build HTTP client");
    let state = AppState::new(config.clone(), network);

    // A failed install leaves the worker redundant; requests still pass through.
    match state.worker().install().await {
        Ok(()) => match state.worker().activate().await {
            Ok(report) => tracing::info!(
                deleted = report.deleted.len(),
                version = %config.worker.cache_version,
                "Caching worker active"
            ),
            Err(e) => tracing::error!(error = %e, "Caching worker activation failed"),
        },
        Err(e) => tracing::error!(error = %e, "Caching worker install failed, serving uncached"),
    }

    let eviction = spawn_eviction_task(state.worker().clone(), state.shutdown_token().clone());

    let app = routes::app(state.clone())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown = state.shutdown_token().clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .expect("Server error");

    state.shutdown_token().cancel();
    if let Err(e) = eviction.await {
        tracing::warn!(error = %e, "Eviction task ended abnormally");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
