//! Messages exchanged with clients, plus push and sync payloads.

use serde::{Deserialize, Serialize};

/// Sync tag registered by the storefront for deferred submissions.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

const DEFAULT_NOTIFICATION_TITLE: &str = "Bazaar";
const DEFAULT_NOTIFICATION_BODY: &str = "You have a new notification";
const DEFAULT_NOTIFICATION_ICON: &str = "/icons/icon-192.png";

/// Broadcast from the worker to every subscribed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// A new cache version took control; clients may reload.
    UpdateAvailable { version: String },
}

/// Outcome of a background sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// The tag is known; nothing needed doing.
    Completed,
    /// The tag is not one the storefront registers.
    Ignored,
}

/// A notification to display for a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Page opened when the notification is clicked.
    pub url: String,
    pub icon: String,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            body: DEFAULT_NOTIFICATION_BODY.to_string(),
            url: "/".to_string(),
            icon: DEFAULT_NOTIFICATION_ICON.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
    icon: Option<String>,
}

impl Notification {
    /// Build a notification from a push payload.
    ///
    /// Missing fields and non-JSON payloads fall back to defaults.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        let defaults = Self::default();
        let Ok(payload) = serde_json::from_slice::<PushPayload>(payload) else {
            return defaults;
        };

        Self {
            title: payload.title.unwrap_or(defaults.title),
            body: payload.body.unwrap_or(defaults.body),
            url: payload.url.unwrap_or(defaults.url),
            icon: payload.icon.unwrap_or(defaults.icon),
        }
    }
}

/// What a client should do in response to a worker event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ClientAction {
    OpenWindow { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_fields_override_defaults() {
        let notification =
            Notification::from_payload(br#"{"title": "Flash sale", "url": "/deals"}"#);
        assert_eq!(notification.title, "Flash sale");
        assert_eq!(notification.url, "/deals");
        assert_eq!(notification.body, DEFAULT_NOTIFICATION_BODY);
    }

    #[test]
    fn test_garbage_payload_uses_defaults() {
        assert_eq!(Notification::from_payload(b"not json"), Notification::default());
        assert_eq!(Notification::from_payload(b""), Notification::default());
    }

    #[test]
    fn test_update_message_wire_shape() {
        let json = serde_json::to_value(WorkerMessage::UpdateAvailable {
            version: "v2".to_string(),
        })
        .unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"type": "update-available", "version": "v2"})
        );
    }
}
