//! Named cache partitions.
//!
//! The worker keeps responses in three partitions (assets, data, runtime)
//! whose names carry the version tag. This module defines the storage
//! interface; the browser implementation sits on the Cache API and the
//! in-memory one backs tests and native builds.

#[cfg(target_arch = "wasm32")]
mod browser;
mod memory;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::CacheError;
use crate::http::ResponseSnapshot;
use std::future::Future;

/// Access to every named partition of the origin's cache storage.
///
/// Partitions are created on first write. Implementations are cheap handles:
/// cloning shares the same underlying storage, which lets detached tasks
/// hold their own copy.
///
/// Note: no `Send` bounds; the worker runs on a single thread and the
/// browser handles are not thread-safe.
pub trait CacheStorage: Clone + 'static {
    /// Looks up `key` (an absolute URL) in `partition`.
    ///
    /// A partition that doesn't exist yet is simply a miss.
    fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<ResponseSnapshot>, CacheError>>;

    /// Stores `response` under `key`, replacing any existing entry.
    fn put(
        &self,
        partition: &str,
        key: &str,
        response: &ResponseSnapshot,
    ) -> impl Future<Output = Result<(), CacheError>>;

    /// Names of every existing partition.
    fn partition_names(&self) -> impl Future<Output = Result<Vec<String>, CacheError>>;

    /// Deletes a whole partition. Returns whether it existed.
    fn delete_partition(&self, partition: &str) -> impl Future<Output = Result<bool, CacheError>>;
}
