use super::{NewQueueRecord, QueueRecord, QueueStore, StoredRecord};
use crate::error::QueueError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A stored value: a record, or the reason it can't be read back.
type Slot = Result<NewQueueRecord, String>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, Slot>,
}

impl Inner {
    fn insert(&mut self, slot: Slot) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.records.insert(id, slot);
        id
    }
}

/// In-memory queue store.
///
/// Ids start at 1 and are never reused, like an IndexedDB key generator.
#[derive(Clone, Default)]
pub struct MemoryQueueStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().records.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.inner.borrow().records.keys().copied().collect()
    }

    /// Stores an entry that fails to decode, like a record a page wrote
    /// with a body the worker can't read.
    pub fn add_unreadable(&self, reason: &str) -> u64 {
        self.inner.borrow_mut().insert(Err(reason.to_string()))
    }
}

impl QueueStore for MemoryQueueStore {
    async fn add(&self, record: &NewQueueRecord) -> Result<u64, QueueError> {
        Ok(self.inner.borrow_mut().insert(Ok(record.clone())))
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>, QueueError> {
        Ok(self
            .inner
            .borrow()
            .records
            .iter()
            .map(|(id, slot)| match slot {
                Ok(request) => Ok(QueueRecord {
                    id: *id,
                    request: request.clone(),
                }),
                Err(reason) => Err(QueueError::InvalidRecord(format!("#{}: {}", id, reason))),
            })
            .collect())
    }

    async fn delete(&self, id: u64) -> Result<(), QueueError> {
        self.inner.borrow_mut().records.remove(&id);
        Ok(())
    }
}
