// Grouping pipeline - JSON lines in, batches out
//
// Reads one SinkRecord per line, feeds the grouper, and flushes through the
// sink whenever the buffered record count reaches the configured cadence.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use topicgroup_batch::{RecordGrouper, TopicPartitionRecordGrouper};
use topicgroup_config::RuntimeConfig;
use topicgroup_core::SinkRecord;
use tracing::{debug, info, warn};

use crate::sink::BatchSink;

/// Totals reported once the input is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub records: usize,
    pub batches: usize,
    pub flushes: usize,
}

/// Build a grouper from the grouper section of the config
pub fn build_grouper(config: &RuntimeConfig) -> Result<TopicPartitionRecordGrouper<SinkRecord>> {
    let grouper = TopicPartitionRecordGrouper::new(
        config.grouper.template()?,
        config.grouper.max_records(),
        config.grouper.build_timestamp_source()?,
    )
    .context("Failed to create record grouper")?;
    Ok(grouper)
}

pub struct GroupingPipeline {
    grouper: TopicPartitionRecordGrouper<SinkRecord>,
    sink: BatchSink,
    flush_every_records: usize,
}

impl GroupingPipeline {
    pub fn new(
        grouper: TopicPartitionRecordGrouper<SinkRecord>,
        sink: BatchSink,
        flush_every_records: usize,
    ) -> Self {
        Self {
            grouper,
            sink,
            flush_every_records,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        Ok(Self::new(
            build_grouper(config)?,
            BatchSink::from_config(config)?,
            config.flush.every_records,
        ))
    }

    pub fn sink(&self) -> &BatchSink {
        &self.sink
    }

    /// Consume every line of `input`, flushing on cadence and at the end
    pub async fn run<I>(&mut self, input: I) -> Result<GroupSummary>
    where
        I: AsyncBufRead + Unpin,
    {
        let mut summary = GroupSummary::default();
        let mut lines = input.lines();
        let mut line_number = 0_usize;
        let mut buffered = 0_usize;

        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: SinkRecord = serde_json::from_str(&line)
                .with_context(|| format!("Invalid record on line {}", line_number))?;
            if let Err(err) = self.grouper.put(record) {
                // Keep what was grouped before the failing record
                warn!(line = line_number, error = %err, "Flushing buffered batches before abort");
                self.flush(&mut summary).await?;
                return Err(err)
                    .with_context(|| format!("Failed to group record on line {}", line_number));
            }
            summary.records += 1;
            buffered += 1;

            if self.flush_every_records > 0 && buffered >= self.flush_every_records {
                debug!(buffered, "Flush cadence reached");
                self.flush(&mut summary).await?;
                buffered = 0;
            }
        }

        self.flush(&mut summary).await?;

        info!(
            records = summary.records,
            batches = summary.batches,
            flushes = summary.flushes,
            "Input exhausted"
        );
        Ok(summary)
    }

    async fn flush(&mut self, summary: &mut GroupSummary) -> Result<()> {
        let stats = self.sink.flush(&mut self.grouper).await?;
        if stats.batches > 0 {
            summary.batches += stats.batches;
            summary.flushes += 1;
        }
        Ok(())
    }
}
