//! Worker configuration.
//!
//! All partition names, the precache list and the routing rules are derived
//! from a single [`WorkerConfig`] value. It is built once when the worker
//! starts and shared read-only (behind an `Rc`) with every component.

use crate::error::WorkerError;
use serde::{Deserialize, Serialize};

/// Suffixes appended to the version tag to form the partition names.
const ASSETS_SUFFIX: &str = "assets";
const DATA_SUFFIX: &str = "data";
const RUNTIME_SUFFIX: &str = "runtime";

/// Defaults used when a push payload leaves a field out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Vibration pattern in milliseconds (on, off, on, ...).
    pub vibrate: Vec<u32>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "FlowForge".to_string(),
            body: "You have a new update".to_string(),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/icon-72x72.png".to_string(),
            vibrate: vec![100, 50, 100],
        }
    }
}

/// Immutable configuration for one worker generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Namespace shared by every partition this worker has ever created.
    pub cache_prefix: String,
    /// Version tag, e.g. `flowforge-v1.0.0`. Must start with `cache_prefix`.
    pub version: String,
    /// Static files written to the assets partition on install.
    pub precache_urls: Vec<String>,
    /// Path segment identifying API calls (always network-first).
    pub api_marker: String,
    /// Extensions served cache-first.
    pub core_extensions: Vec<String>,
    /// IndexedDB database holding the sync queue.
    pub queue_database: String,
    /// Object store holding queue records.
    pub queue_store: String,
    /// Background sync tag that drains the queue.
    pub sync_tag: String,
    /// Body of the synthesized 503 response.
    pub offline_message: String,
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    pub notification: NotificationDefaults,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_prefix: "flowforge-".to_string(),
            version: "flowforge-v1.0.0".to_string(),
            precache_urls: [
                "/",
                "/index.html",
                "/app.js",
                "/styles.css",
                "/manifest.json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            api_marker: "/api/".to_string(),
            core_extensions: vec![".html".to_string(), ".js".to_string(), ".css".to_string()],
            queue_database: "flowforge-db".to_string(),
            queue_store: "sync-queue".to_string(),
            sync_tag: "sync-data".to_string(),
            offline_message: "Offline - content not available".to_string(),
            log_level: "debug".to_string(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl WorkerConfig {
    /// Creates the default FlowForge configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version tag.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replaces the precache list.
    pub fn with_precache<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sync tag.
    pub fn with_sync_tag(mut self, tag: impl Into<String>) -> Self {
        self.sync_tag = tag.into();
        self
    }

    /// Checks the invariants the partition naming relies on.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.cache_prefix.is_empty() {
            return Err(WorkerError::Config("cache prefix is empty".to_string()));
        }
        if self.version.is_empty() {
            return Err(WorkerError::Config("version tag is empty".to_string()));
        }
        if !self.version.starts_with(&self.cache_prefix) {
            return Err(WorkerError::Config(format!(
                "version tag '{}' does not start with prefix '{}'",
                self.version, self.cache_prefix
            )));
        }
        Ok(())
    }

    fn partition(&self, suffix: &str) -> String {
        format!("{}-{}", self.version, suffix)
    }

    /// Precached static files.
    pub fn assets_cache(&self) -> String {
        self.partition(ASSETS_SUFFIX)
    }

    /// Reserved for application data; never written by the worker itself.
    pub fn data_cache(&self) -> String {
        self.partition(DATA_SUFFIX)
    }

    /// Responses cached by the network-first strategy.
    pub fn runtime_cache(&self) -> String {
        self.partition(RUNTIME_SUFFIX)
    }

    /// The three partitions that survive activation.
    pub fn current_caches(&self) -> [String; 3] {
        [self.assets_cache(), self.data_cache(), self.runtime_cache()]
    }

    /// Whether `name` belongs to this worker's namespace but an older version.
    pub fn is_stale_cache(&self, name: &str) -> bool {
        name.starts_with(&self.cache_prefix) && !self.current_caches().iter().any(|c| c == name)
    }

    /// Parses `log_level`, falling back to `Debug`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Debug)
    }
}
