// Mutex-guarded grouper for hosts that feed one grouper from several threads

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use topicgroup_core::Result;

use crate::RecordGrouper;

/// Thread-safe handle to a grouper.
///
/// Every operation takes the lock for its whole duration, so `put` calls are
/// serialized and `drain` observes a consistent set of batches.
pub struct SharedGrouper<G> {
    inner: Arc<Mutex<G>>,
}

impl<G> Clone for SharedGrouper<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: RecordGrouper> SharedGrouper<G> {
    pub fn new(grouper: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(grouper)),
        }
    }

    pub fn put(&self, record: G::Record) -> Result<()> {
        self.inner.lock().put(record)
    }

    /// Take every batch and reset the grouper in one step
    pub fn drain(&self) -> HashMap<String, Vec<G::Record>> {
        self.inner.lock().drain()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Run `f` against the current batches while holding the lock
    pub fn with_records<T>(&self, f: impl FnOnce(&HashMap<String, Vec<G::Record>>) -> T) -> T {
        let guard = self.inner.lock();
        f(guard.records())
    }

    pub fn batch_count(&self) -> usize {
        self.with_records(HashMap::len)
    }
}
