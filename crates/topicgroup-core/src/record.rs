//! Record types consumed by the grouping layer
//!
//! The grouper only needs a record's topic, partition and offset, so it works
//! against the [`GroupedRecord`] trait. [`SinkRecord`] is the concrete record
//! read from JSON lines by the binary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A topic and partition pair identifying one ordered stream of records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    topic: Arc<str>,
    partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<Arc<str>>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Accessors required by the grouping layer.
///
/// Offsets must be non-decreasing per topic partition.
pub trait GroupedRecord {
    fn topic(&self) -> &str;
    fn partition(&self) -> i32;
    fn offset(&self) -> i64;

    fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic(), self.partition())
    }
}

impl<R: GroupedRecord + ?Sized> GroupedRecord for Arc<R> {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    fn partition(&self) -> i32 {
        (**self).partition()
    }

    fn offset(&self) -> i64 {
        (**self).offset()
    }
}

impl<R: GroupedRecord + ?Sized> GroupedRecord for &R {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    fn partition(&self) -> i32 {
        (**self).partition()
    }

    fn offset(&self) -> i64 {
        (**self).offset()
    }
}

/// A record delivered by the upstream feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    #[serde(default)]
    pub key: serde_json::Value,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Producer timestamp in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl SinkRecord {
    /// Create a record with no key, value or headers
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: serde_json::Value::Null,
            value: serde_json::Value::Null,
            timestamp: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }
}

impl GroupedRecord for SinkRecord {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition(&self) -> i32 {
        self.partition
    }

    fn offset(&self) -> i64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sink_record_from_json_line() {
        let line = r#"{"topic":"orders","partition":3,"offset":42,"value":{"id":7}}"#;
        let record: SinkRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.topic, "orders");
        assert_eq!(record.partition, 3);
        assert_eq!(record.offset, 42);
        assert_eq!(record.key, serde_json::Value::Null);
        assert_eq!(record.value, json!({"id": 7}));
        assert!(record.headers.is_empty());
    }

    #[test]
    fn test_topic_partition_identity() {
        let a = SinkRecord::new("orders", 1, 10);
        let b = SinkRecord::new("orders", 1, 11);
        let c = SinkRecord::new("orders", 2, 10);

        assert_eq!(a.topic_partition(), b.topic_partition());
        assert_ne!(a.topic_partition(), c.topic_partition());
        assert_eq!(a.topic_partition().to_string(), "orders-1");
    }

    #[test]
    fn test_shared_records_expose_same_fields() {
        let record = Arc::new(SinkRecord::new("orders", 0, 5));
        assert_eq!(record.topic(), "orders");
        assert_eq!(record.offset(), 5);
        assert_eq!(
            GroupedRecord::topic_partition(&record),
            TopicPartition::new("orders", 0)
        );
    }
}
