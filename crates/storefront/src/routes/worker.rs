//! Worker side channels: client events, status, sync, push and notification
//! clicks.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::error::add_breadcrumb;
use crate::fetch::Fetcher;
use crate::state::AppState;
use crate::worker::{ClientAction, Notification, SyncOutcome, WorkerStatus};

/// Build the worker router (mounted under `/__worker`).
pub fn router<F: Fetcher>() -> Router<AppState<F>> {
    Router::new()
        .route("/events", get(events::<F>))
        .route("/status", get(status::<F>))
        .route("/sync/{tag}", post(sync::<F>))
        .route("/push", post(push::<F>))
        .route("/notification-click", post(notification_click::<F>))
}

/// Stream worker broadcasts as server-sent events.
///
/// GET /__worker/events
async fn events<F: Fetcher>(
    State(state): State<AppState<F>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut messages = state.worker().subscribe();
    let shutdown = state.shutdown_token().clone();

    let event_stream = stream! {
        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => break,
                received = messages.recv() => received,
            };

            match received {
                Ok(message) => {
                    let json = serde_json::to_string(&message).unwrap_or_else(|_| {
                        r#"{"type":"error","message":"Failed to serialize event"}"#.to_string()
                    });
                    yield Ok::<Event, Infallible>(Event::default().event("worker").data(json));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Worker event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Worker lifecycle and namespace sizes.
///
/// GET /__worker/status
async fn status<F: Fetcher>(State(state): State<AppState<F>>) -> Json<WorkerStatus> {
    Json(state.worker().status())
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    tag: String,
    outcome: SyncOutcome,
}

/// Background sync event.
///
/// POST /__worker/sync/{tag}
async fn sync<F: Fetcher>(
    State(state): State<AppState<F>>,
    Path(tag): Path<String>,
) -> Json<SyncResponse> {
    let outcome = state.worker().handle_sync(&tag);
    add_breadcrumb("worker", "Background sync", Some(&[("tag", tag.as_str())]));
    Json(SyncResponse { tag, outcome })
}

/// Push message; returns the notification to display.
///
/// POST /__worker/push
async fn push<F: Fetcher>(State(state): State<AppState<F>>, body: Bytes) -> Json<Notification> {
    let notification = state.worker().handle_push(&body);
    add_breadcrumb(
        "worker",
        "Push received",
        Some(&[("title", notification.title.as_str())]),
    );
    Json(notification)
}

/// Notification click; returns the window to open.
///
/// POST /__worker/notification-click
async fn notification_click<F: Fetcher>(
    State(state): State<AppState<F>>,
    Json(notification): Json<Notification>,
) -> Json<ClientAction> {
    Json(state.worker().handle_notification_click(&notification))
}
