//! Messages exchanged between the worker and the pages it controls.

use crate::queue::NewQueueRecord;
use serde::{Deserialize, Serialize};

/// `type` of the message that queues a request.
pub const QUEUE_REQUEST: &str = "QUEUE_REQUEST";

/// Commands a page can post to the worker, identified by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting worker immediately.
    SkipWaiting,
    /// Add the given URLs to the runtime partition.
    CacheUrls { urls: Vec<String> },
    /// Delete every cache partition, whatever its namespace.
    ClearCache,
    /// Defer a request until the next background sync.
    QueueRequest(NewQueueRecord),
    /// Report the active version tag.
    GetVersion,
}

impl ControlMessage {
    /// Parses a message payload; unknown or malformed messages yield `None`.
    pub fn parse(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                log::debug!("Ignoring unrecognized message: {}", e);
                None
            }
        }
    }
}

/// Reply posted on the message's response port.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ControlReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ControlReply {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }
}

/// Messages the worker broadcasts to every open page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// A sync pass finished. `count` is the number of records attempted,
    /// `synced` the number that replayed successfully.
    SyncComplete { count: usize, synced: usize },
}
