// Integration tests for topicgroup-batch
//
// Exercises the grouper through its public API with the scenarios a sink
// connector relies on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::TimeZone;
use chrono_tz::Tz;
use topicgroup_batch::{RecordGrouper, TopicPartitionRecordGrouper};
use topicgroup_core::{FixedTimestampSource, SinkRecord, Template, TimestampSource};

const TEMPLATE: &str = "{{topic}}-{{partition}}-{{start_offset}}";

fn source() -> Box<dyn TimestampSource> {
    Box::new(FixedTimestampSource::new(
        Tz::UTC.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap(),
    ))
}

fn new_grouper(template: &str, limit: Option<usize>) -> TopicPartitionRecordGrouper<SinkRecord> {
    TopicPartitionRecordGrouper::new(Template::parse(template).unwrap(), limit, source()).unwrap()
}

fn put_all(grouper: &mut TopicPartitionRecordGrouper<SinkRecord>, records: &[(&str, i32, i64)]) {
    for (topic, partition, offset) in records {
        grouper
            .put(SinkRecord::new(*topic, *partition, *offset))
            .unwrap();
    }
}

fn as_offsets(batches: &HashMap<String, Vec<SinkRecord>>) -> HashMap<String, Vec<i64>> {
    batches
        .iter()
        .map(|(key, records)| (key.clone(), records.iter().map(|r| r.offset).collect()))
        .collect()
}

fn expected(entries: &[(&str, &[i64])]) -> HashMap<String, Vec<i64>> {
    entries
        .iter()
        .map(|(key, offsets)| (key.to_string(), offsets.to_vec()))
        .collect()
}

#[test]
fn limited_batches_roll_over_at_limit() {
    let mut grouper = new_grouper(TEMPLATE, Some(2));
    put_all(
        &mut grouper,
        &[("t", 0, 10), ("t", 0, 11), ("t", 0, 12), ("t", 0, 13)],
    );

    assert_eq!(
        as_offsets(grouper.records()),
        expected(&[("t-0-10", &[10, 11]), ("t-0-12", &[12, 13])])
    );
}

#[test]
fn unlimited_batches_one_per_partition() {
    let mut grouper = new_grouper(TEMPLATE, None);
    put_all(
        &mut grouper,
        &[("t", 0, 5), ("t", 1, 0), ("t", 0, 6), ("t", 1, 1), ("t", 0, 7)],
    );

    assert_eq!(
        as_offsets(grouper.records()),
        expected(&[("t-0-5", &[5, 6, 7]), ("t-1-0", &[0, 1])])
    );
}

#[test]
fn unlimited_mode_keeps_arrival_order() {
    let mut grouper = new_grouper(TEMPLATE, None);
    for offset in 0..1_000 {
        grouper.put(SinkRecord::new("orders", 4, offset)).unwrap();
    }

    assert_eq!(grouper.records().len(), 1);
    let batch = &grouper.records()["orders-4-0"];
    assert!(batch.windows(2).all(|w| w[0].offset < w[1].offset));
    assert_eq!(batch.len(), 1_000);
}

#[test]
fn batch_count_is_ceiling_of_records_over_limit() {
    for (records, limit) in [(1_i64, 1_usize), (10, 3), (9, 3), (100, 7), (5, 10)] {
        let mut grouper = new_grouper(TEMPLATE, Some(limit));
        for offset in 0..records {
            grouper.put(SinkRecord::new("t", 0, offset)).unwrap();
        }

        let batches = grouper.records();
        assert_eq!(batches.len(), (records as usize).div_ceil(limit));
        assert!(batches.values().all(|batch| batch.len() <= limit));
        assert_eq!(
            batches.values().map(Vec::len).sum::<usize>(),
            records as usize
        );
    }
}

#[test]
fn clear_makes_next_put_behave_like_the_first() {
    let mut grouper = new_grouper(TEMPLATE, Some(3));
    put_all(&mut grouper, &[("t", 0, 1), ("t", 0, 2)]);

    grouper.clear();
    assert!(grouper.records().is_empty());

    put_all(&mut grouper, &[("t", 0, 3), ("t", 0, 4)]);
    assert_eq!(
        as_offsets(grouper.records()),
        expected(&[("t-0-3", &[3, 4])])
    );
}

#[test]
fn padded_and_plain_offsets_from_same_head() {
    let mut padded = new_grouper("{{topic}}-{{partition}}-{{start_offset:padding=true}}", None);
    let mut plain = new_grouper("{{topic}}-{{partition}}-{{start_offset:padding=false}}", None);
    padded.put(SinkRecord::new("t", 0, 1234)).unwrap();
    plain.put(SinkRecord::new("t", 0, 1234)).unwrap();

    assert!(padded.records().contains_key("t-0-00000000000000001234"));
    assert!(plain.records().contains_key("t-0-1234"));
}

#[test]
fn key_changes_with_each_head_input() {
    let template = "{{topic}}/{{partition}}/{{start_offset}}/{{timestamp:unit=dd}}";
    let mut grouper = new_grouper(template, None);
    put_all(
        &mut grouper,
        &[("a", 0, 1), ("a", 0, 2), ("b", 0, 1), ("a", 1, 1)],
    );

    let mut keys: Vec<&String> = grouper.records().keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["a/0/1/15", "a/1/1/15", "b/0/1/15"]);

    let other_day = TopicPartitionRecordGrouper::<SinkRecord>::new(
        Template::parse(template).unwrap(),
        None,
        Box::new(FixedTimestampSource::new(
            Tz::UTC.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap(),
        )),
    );
    let mut other_day = other_day.unwrap();
    other_day.put(SinkRecord::new("a", 0, 1)).unwrap();
    assert!(other_day.records().contains_key("a/0/1/16"));
}

#[test]
fn records_can_be_shared_rather_than_copied() {
    let template = Template::parse(TEMPLATE).unwrap();
    let mut grouper: TopicPartitionRecordGrouper<Arc<SinkRecord>> =
        TopicPartitionRecordGrouper::new(template, Some(1), source()).unwrap();

    let record = Arc::new(SinkRecord::new("t", 2, 9));
    grouper.put(Arc::clone(&record)).unwrap();

    assert!(Arc::ptr_eq(&grouper.records()["t-2-9"][0], &record));
}
