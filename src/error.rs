//! Error types for the worker and its storage/network backends.

use thiserror::Error;

/// Errors raised by a [`CacheStorage`](crate::cache::CacheStorage) backend.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The cache storage or a partition could not be opened.
    #[error("Cache open failed for '{partition}': {message}")]
    OpenFailed { partition: String, message: String },
    /// A read, write or delete against a partition failed.
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

/// Errors raised by a [`Network`](crate::network::Network) backend.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// The request could not be constructed (bad URL, bad method).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The fetch itself rejected (offline, DNS, CORS).
    #[error("Fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },
    /// The server answered, but not with a 2xx status.
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    BodyRead(String),
}

/// Errors raised by a [`QueueStore`](crate::queue::QueueStore) backend.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The database could not be opened or upgraded.
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    /// A transaction failed to complete.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    /// A record could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A stored record has a bad URL or an undecodable body.
    #[error("Invalid queue record: {0}")]
    InvalidRecord(String),
}

/// Top-level error for worker event handlers.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A precache asset could not be fetched; the whole batch is rejected.
    #[error("Failed to precache {url}: {reason}")]
    Precache { url: String, reason: String },
    /// The platform refused a host operation (skipWaiting, clients.claim, ...).
    #[error("Host error: {0}")]
    Host(String),
    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
