use super::CacheStorage;
use crate::error::CacheError;
use crate::http::ResponseSnapshot;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// In-memory cache storage.
///
/// Nothing is persisted; used by tests and native embedding.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    partitions: Rc<RefCell<BTreeMap<String, HashMap<String, ResponseSnapshot>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty partition, as `caches.open` would.
    pub fn create_partition(&self, partition: &str) {
        self.partitions
            .borrow_mut()
            .entry(partition.to_string())
            .or_default();
    }

    pub fn contains(&self, partition: &str, key: &str) -> bool {
        self.partitions
            .borrow()
            .get(partition)
            .is_some_and(|entries| entries.contains_key(key))
    }

    pub fn entry_count(&self, partition: &str) -> usize {
        self.partitions
            .borrow()
            .get(partition)
            .map_or(0, HashMap::len)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.borrow().len()
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> Result<Option<ResponseSnapshot>, CacheError> {
        Ok(self
            .partitions
            .borrow()
            .get(partition)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        partition: &str,
        key: &str,
        response: &ResponseSnapshot,
    ) -> Result<(), CacheError> {
        self.partitions
            .borrow_mut()
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn partition_names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.partitions.borrow().keys().cloned().collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, CacheError> {
        Ok(self.partitions.borrow_mut().remove(partition).is_some())
    }
}
