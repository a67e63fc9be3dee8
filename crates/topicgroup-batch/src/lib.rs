// topicgroup-batch - Grouping of partitioned records into named batches
//
// Decides which batch ("file") a record belongs to and when a new batch
// begins. Writing the batches out is left to the caller: read them with
// `records()`, persist them, then `clear()`.
//
// Nothing here bounds memory. In unlimited mode a grouper keeps every record
// until it is cleared, so hosts must flush and clear on a cadence they own.

use std::collections::HashMap;

use topicgroup_core::Result;

mod grouper;
mod shared;

pub use grouper::{key_bindings, TopicPartitionRecordGrouper};
pub use shared::SharedGrouper;

/// A strategy for grouping records into batches keyed by file name.
pub trait RecordGrouper {
    type Record;

    /// Add a record to the batch it belongs to
    fn put(&mut self, record: Self::Record) -> Result<()>;

    /// Batches accumulated since the last clear, keyed by file name
    fn records(&self) -> &HashMap<String, Vec<Self::Record>>;

    /// Forget all batches and partition state
    fn clear(&mut self);

    /// Take all batches and clear
    fn drain(&mut self) -> HashMap<String, Vec<Self::Record>>;
}
