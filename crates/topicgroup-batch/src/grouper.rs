// Topic/partition record grouping
//
// Records of one topic partition accumulate under a key rendered from the
// batch's head record. With a record limit configured, the batch rolls over
// to a new head once it is full.

use std::collections::HashMap;

use chrono::DateTime;
use chrono_tz::Tz;
use topicgroup_core::{
    Binding, Bindings, GroupedRecord, GrouperError, Result, Template, TemplateError,
    TemplateVariable, TimestampSource, TopicPartition,
};
use tracing::debug;

use crate::RecordGrouper;

/// Identity of the open batch of one partition.
///
/// The timestamp is sampled when the head is promoted and stays frozen for
/// the lifetime of the batch.
#[derive(Debug, Clone, PartialEq)]
struct HeadRecord {
    offset: i64,
    timestamp: DateTime<Tz>,
}

impl HeadRecord {
    fn new<R: GroupedRecord>(record: &R, timestamp: DateTime<Tz>) -> Self {
        Self {
            offset: record.offset(),
            timestamp,
        }
    }
}

/// Bindings for the variables a head record contributes to its batch key
pub fn key_bindings(
    topic: &str,
    partition: i32,
    start_offset: i64,
    timestamp: DateTime<Tz>,
) -> Bindings {
    Bindings::new()
        .bind(
            TemplateVariable::Topic.name(),
            Binding::Literal(topic.to_string()),
        )
        .bind(
            TemplateVariable::Partition.name(),
            Binding::Literal(partition.to_string()),
        )
        .bind(
            TemplateVariable::StartOffset.name(),
            Binding::Offset(start_offset),
        )
        .bind(
            TemplateVariable::Timestamp.name(),
            Binding::Timestamp(timestamp),
        )
}

/// Groups records by topic and partition.
///
/// The filename template must declare the `topic`, `partition` and
/// `start_offset` variables. Batches are unlimited in size unless
/// `max_records_per_file` is set.
pub struct TopicPartitionRecordGrouper<R> {
    template: Template,
    max_records_per_file: Option<usize>,
    timestamp_source: Box<dyn TimestampSource>,
    head_records: HashMap<TopicPartition, HeadRecord>,
    file_buffers: HashMap<String, Vec<R>>,
}

impl<R: GroupedRecord> TopicPartitionRecordGrouper<R> {
    pub fn new(
        template: Template,
        max_records_per_file: Option<usize>,
        timestamp_source: Box<dyn TimestampSource>,
    ) -> Result<Self> {
        let missing: Vec<&str> = [
            TemplateVariable::Topic,
            TemplateVariable::Partition,
            TemplateVariable::StartOffset,
        ]
        .into_iter()
        .map(TemplateVariable::name)
        .filter(|name| !template.has_variable(name))
        .collect();
        if !missing.is_empty() {
            return Err(GrouperError::invalid_argument(format!(
                "template '{}' must declare variables: {}",
                template,
                missing.join(", ")
            )));
        }
        template.check_parameters()?;

        if max_records_per_file == Some(0) {
            return Err(GrouperError::invalid_argument(
                "max_records_per_file must be greater than 0",
            ));
        }

        Ok(Self {
            template,
            max_records_per_file,
            timestamp_source,
            head_records: HashMap::new(),
            file_buffers: HashMap::new(),
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn max_records_per_file(&self) -> Option<usize> {
        self.max_records_per_file
    }

    /// Number of open batches
    pub fn batch_count(&self) -> usize {
        self.file_buffers.len()
    }

    /// Number of buffered records across all batches
    pub fn record_count(&self) -> usize {
        self.file_buffers.values().map(Vec::len).sum()
    }

    /// Number of partitions with a head record
    pub fn partition_count(&self) -> usize {
        self.head_records.len()
    }

    fn render_key(
        &self,
        tp: &TopicPartition,
        head: &HeadRecord,
    ) -> std::result::Result<String, TemplateError> {
        let bindings = key_bindings(tp.topic(), tp.partition(), head.offset, head.timestamp);
        self.template.render(&bindings)
    }

    fn is_full(&self, key: &str, limit: usize) -> bool {
        self.file_buffers
            .get(key)
            .is_some_and(|buffer| buffer.len() >= limit)
    }

    fn should_create_new_file(&self, key: &str) -> bool {
        match self.max_records_per_file {
            None => false,
            Some(limit) => !self.file_buffers.contains_key(key) || self.is_full(key, limit),
        }
    }
}

impl<R: GroupedRecord> RecordGrouper for TopicPartitionRecordGrouper<R> {
    type Record = R;

    fn put(&mut self, record: R) -> Result<()> {
        let tp = record.topic_partition();

        // Keys are rendered before any state changes so a failed render
        // leaves the grouper untouched.
        let (current_head, new_partition) = match self.head_records.get(&tp) {
            Some(head) => (head.clone(), false),
            None => (HeadRecord::new(&record, self.timestamp_source.time()), true),
        };
        let current_key = self.render_key(&tp, &current_head)?;

        if !self.should_create_new_file(&current_key) {
            if new_partition {
                debug!(partition = %tp, key = %current_key, "Opening first batch for partition");
                self.head_records.insert(tp, current_head);
            }
            self.file_buffers
                .entry(current_key)
                .or_default()
                .push(record);
            return Ok(());
        }

        let (head, key) = if new_partition {
            (current_head, current_key)
        } else {
            let head = HeadRecord::new(&record, self.timestamp_source.time());
            let key = self.render_key(&tp, &head)?;
            (head, key)
        };

        if let Some(limit) = self.max_records_per_file {
            if self.is_full(&key, limit) {
                return Err(GrouperError::KeyCollision { key, limit });
            }
        }

        debug!(
            partition = %tp,
            start_offset = head.offset,
            key = %key,
            "Rolling over to new batch"
        );
        self.head_records.insert(tp, head);
        self.file_buffers.entry(key).or_default().push(record);
        Ok(())
    }

    fn records(&self) -> &HashMap<String, Vec<R>> {
        &self.file_buffers
    }

    fn clear(&mut self) {
        self.head_records.clear();
        self.file_buffers.clear();
    }

    fn drain(&mut self) -> HashMap<String, Vec<R>> {
        self.head_records.clear();
        std::mem::take(&mut self.file_buffers)
    }
}
