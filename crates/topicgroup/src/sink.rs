// Batch sink - persists grouped batches through an OpenDAL operator
//
// Each batch is written as JSON lines under its batch key. A flush is
// all-or-nothing: the grouper is only cleared once every batch is written.

use anyhow::{Context, Result};
use topicgroup_batch::RecordGrouper;
use topicgroup_config::{normalize_prefix, RuntimeConfig, StorageBackend};
use topicgroup_core::SinkRecord;
use tracing::{debug, info};

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub batches: usize,
    pub records: usize,
}

pub struct BatchSink {
    operator: opendal::Operator,
    prefix: Option<String>,
}

impl BatchSink {
    pub fn new(operator: opendal::Operator, prefix: Option<String>) -> Self {
        Self {
            operator,
            prefix: prefix.and_then(normalize_prefix),
        }
    }

    /// Build the operator selected by the storage config
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let operator = match config.storage.backend {
            StorageBackend::Fs => {
                let fs = config
                    .storage
                    .fs
                    .as_ref()
                    .context("fs config required for filesystem backend")?;
                let builder = opendal::services::Fs::default().root(&fs.path);
                opendal::Operator::new(builder)
                    .context("Failed to create filesystem operator")?
                    .finish()
            }
            StorageBackend::Memory => {
                opendal::Operator::new(opendal::services::Memory::default())
                    .context("Failed to create memory operator")?
                    .finish()
            }
        };
        Ok(Self::new(operator, config.storage.prefix.clone()))
    }

    pub fn operator(&self) -> &opendal::Operator {
        &self.operator
    }

    pub fn path_for(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Write every batch held by the grouper, then clear it
    pub async fn flush<G>(&self, grouper: &mut G) -> Result<FlushStats>
    where
        G: RecordGrouper<Record = SinkRecord>,
    {
        let mut stats = FlushStats::default();

        for (key, records) in grouper.records() {
            let path = self.path_for(key);
            let body = encode_json_lines(records)?;
            self.operator
                .write(&path, body)
                .await
                .with_context(|| format!("Failed to write batch '{}'", path))?;
            debug!(path = %path, records = records.len(), "Wrote batch");

            stats.batches += 1;
            stats.records += records.len();
        }

        grouper.clear();

        if stats.batches > 0 {
            info!(
                batches = stats.batches,
                records = stats.records,
                "Flushed batches"
            );
        }
        Ok(stats)
    }
}

fn encode_json_lines(records: &[SinkRecord]) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(records.len() * 64);
    for record in records {
        serde_json::to_writer(&mut body, record).context("Failed to encode record")?;
        body.push(b'\n');
    }
    Ok(body)
}
