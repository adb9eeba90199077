//! Age-based eviction of cached images.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::CacheWorker;
use super::storage::CacheNamespace;
use crate::fetch::Fetcher;

/// Result of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    /// Entries kept because their `date` header was missing or unparsable.
    pub undated: usize,
}

/// Delete entries whose `date` header is strictly older than `max_age`.
pub async fn sweep_namespace(
    namespace: &CacheNamespace,
    now: DateTime<Utc>,
    max_age: TimeDelta,
) -> SweepReport {
    let mut report = SweepReport::default();

    for (key, response) in namespace.entries() {
        report.scanned += 1;
        match response.date() {
            Some(date) if now.signed_duration_since(date) > max_age => {
                if namespace.delete(&key).await {
                    report.deleted += 1;
                }
            }
            Some(_) => {}
            None => report.undated += 1,
        }
    }

    debug!(
        namespace = namespace.name(),
        scanned = report.scanned,
        deleted = report.deleted,
        "Sweep finished"
    );
    report
}

/// Run [`CacheWorker::sweep_expired_images`] every `sweep_interval` until
/// `cancel` fires.
pub fn spawn_eviction_task<F: Fetcher>(
    worker: CacheWorker<F>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period = worker.config().sweep_interval;

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = worker.sweep_expired_images(Utc::now()).await;
                    if report.deleted > 0 {
                        info!(deleted = report.deleted, "Evicted expired images");
                    }
                }
            }
        }
        debug!("Image eviction task stopped");
    })
}
