//! Persisted queue of deferred outbound requests.
//!
//! Records are appended by pages (directly in IndexedDB or through the
//! `QUEUE_REQUEST` message) and drained by the sync coordinator. The store
//! is a plain append/delete list keyed by an auto-incrementing id.
//!
//! ## Record layout
//!
//! ```text
//! { id: 1, url: "/api/flows", method: "POST",
//!   headers: { "content-type": "application/json" },
//!   body: "{\"name\":\"draft\"}" }
//! ```
//!
//! `body` is either a string or raw bytes (`Uint8Array`, `ArrayBuffer`,
//! `Blob`). In JSON, bytes are an array of numbers.

#[cfg(target_arch = "wasm32")]
mod indexeddb;
mod memory;

#[cfg(target_arch = "wasm32")]
pub use indexeddb::IndexedDbQueueStore;
pub use memory::MemoryQueueStore;

use crate::error::QueueError;
use crate::http::{Headers, RequestDestination, RequestSnapshot};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Body of a deferred request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl RecordBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RecordBody::Text(text) => text.as_bytes(),
            RecordBody::Bytes(bytes) => bytes,
        }
    }
}

/// Method used when a record doesn't name one.
pub const DEFAULT_METHOD: &str = "POST";

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

/// A request waiting to be queued (no id assigned yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQueueRecord {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RecordBody>,
}

impl NewQueueRecord {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: RecordBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// A stored queue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: u64,
    #[serde(flatten)]
    pub request: NewQueueRecord,
}

impl QueueRecord {
    /// Builds the request to replay. Relative URLs are resolved against `origin`.
    pub fn to_request(&self, origin: &url::Url) -> Result<RequestSnapshot, QueueError> {
        let url = origin.join(&self.request.url).map_err(|e| {
            QueueError::InvalidRecord(format!("bad url '{}': {}", self.request.url, e))
        })?;
        Ok(RequestSnapshot {
            method: self.request.method.clone(),
            url: url.to_string(),
            headers: self.request.headers.clone(),
            body: self.request.body.as_ref().map(|body| body.as_bytes().to_vec()),
            destination: RequestDestination::Other,
        })
    }
}

/// One entry read back from the store.
pub type StoredRecord = Result<QueueRecord, QueueError>;

/// The queue record store.
///
/// Every call runs in its own transaction: `get_all` read-only, `add` and
/// `delete` read-write.
pub trait QueueStore: Clone + 'static {
    /// Appends a record and returns its id.
    fn add(&self, record: &NewQueueRecord) -> impl Future<Output = Result<u64, QueueError>>;

    /// Every stored entry in key order.
    ///
    /// An entry that can't be decoded is returned as an error in place, so
    /// the caller still sees it; the outer error means the store itself
    /// couldn't be read.
    fn get_all(&self) -> impl Future<Output = Result<Vec<StoredRecord>, QueueError>>;

    /// Removes a record. Deleting a missing id is not an error.
    fn delete(&self, id: u64) -> impl Future<Output = Result<(), QueueError>>;
}
