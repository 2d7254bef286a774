//! Platform-neutral request and response values.
//!
//! The browser's `Request`/`Response` objects are converted into these
//! snapshots at the edge (see `web`), so routing and caching can be
//! exercised without a browser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header map. Names are stored lowercase.
pub type Headers = BTreeMap<String, String>;

/// What the request is for, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDestination {
    /// A top-level or frame navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    /// `fetch()`/XHR and anything else.
    #[default]
    Other,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    /// Absolute URL.
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
    #[serde(default)]
    pub destination: RequestDestination,
}

impl RequestSnapshot {
    /// A plain GET for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
            destination: RequestDestination::Other,
        }
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Identity used as the cache key.
    pub fn cache_key(&self) -> &str {
        &self.url
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Synthesized response for when neither network nor cache can answer.
    pub fn offline(message: &str) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers,
            body: message.as_bytes().to_vec(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Mirrors `Response.ok`: status in 200..=299.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
