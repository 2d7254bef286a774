//! Push notifications.

use super::ServiceWorker;
use crate::cache::CacheStorage;
use crate::config::NotificationDefaults;
use crate::error::WorkerError;
use crate::host::Host;
use crate::network::Network;
use crate::queue::QueueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action id that closes the notification without opening a page.
pub const DISMISS_ACTION: &str = "dismiss";

/// A button shown on the notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
            icon: None,
        }
    }
}

/// Options passed to `showNotification`, serialized as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: Value,
    pub actions: Vec<NotificationAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub options: NotificationOptions,
}

/// JSON body of a push message. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    vibrate: Option<Vec<u32>>,
    data: Option<Value>,
    actions: Option<Vec<NotificationAction>>,
    tag: Option<String>,
}

impl PushPayload {
    /// Absent or empty payloads give an empty object. A payload that isn't a
    /// JSON object is shown as the notification body.
    fn parse(bytes: Option<&[u8]>) -> Self {
        let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_slice(bytes) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Push payload is not a JSON object, using defaults: {}", e);
                let text = String::from_utf8_lossy(bytes).trim().to_string();
                Self {
                    body: (!text.is_empty()).then_some(text),
                    ..Self::default()
                }
            }
        }
    }
}

impl Notification {
    /// Builds the notification for a push message.
    pub fn from_push(payload: Option<&[u8]>, defaults: &NotificationDefaults) -> Self {
        let payload = PushPayload::parse(payload);
        Self {
            title: payload.title.unwrap_or_else(|| defaults.title.clone()),
            options: NotificationOptions {
                body: payload.body.unwrap_or_else(|| defaults.body.clone()),
                icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
                badge: payload.badge.unwrap_or_else(|| defaults.badge.clone()),
                vibrate: payload.vibrate.unwrap_or_else(|| defaults.vibrate.clone()),
                data: payload.data.unwrap_or_else(|| Value::Object(Default::default())),
                actions: payload.actions.unwrap_or_else(|| {
                    vec![
                        NotificationAction::new("open", "Open"),
                        NotificationAction::new(DISMISS_ACTION, "Dismiss"),
                    ]
                }),
                tag: payload.tag,
            },
        }
    }
}

/// URL to open for a click, or `None` when the dismiss action was chosen.
pub fn click_target(action: Option<&str>, data: &Value) -> Option<String> {
    if action == Some(DISMISS_ACTION) {
        return None;
    }
    let url = data
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .unwrap_or("/");
    Some(url.to_string())
}

impl<C, N, Q, H> ServiceWorker<C, N, Q, H>
where
    C: CacheStorage,
    N: Network,
    Q: QueueStore,
    H: Host,
{
    /// Handles a push message by showing a notification.
    pub async fn on_push(&self, payload: Option<&[u8]>) -> Result<Notification, WorkerError> {
        let notification = Notification::from_push(payload, &self.config.notification);
        log::info!("Showing notification: {}", notification.title);
        self.host.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Handles a notification click. The notification itself is closed by
    /// the caller. Returns the URL opened, if any.
    pub async fn on_notification_click(
        &self,
        action: Option<&str>,
        data: &Value,
    ) -> Result<Option<String>, WorkerError> {
        let Some(url) = click_target(action, data) else {
            log::debug!("Notification dismissed");
            return Ok(None);
        };
        self.host.open_or_focus(&url).await?;
        Ok(Some(url))
    }
}
