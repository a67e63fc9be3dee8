// topicgroup - Group partitioned records into named batch files
//
// Library half of the CLI: reads JSON-lines records, routes them through a
// TopicPartitionRecordGrouper, and writes each batch with OpenDAL.

use anyhow::{Context, Result};
use topicgroup_batch::key_bindings;
use topicgroup_config::RuntimeConfig;
use tracing::info;

mod init;
mod pipeline;
mod sink;

pub use init::init_tracing;
pub use pipeline::{build_grouper, GroupSummary, GroupingPipeline};
pub use sink::{BatchSink, FlushStats};

/// Run the grouping pipeline over stdin or a file
pub async fn run_with_config(
    config: RuntimeConfig,
    input: Option<&std::path::Path>,
) -> Result<GroupSummary> {
    let mut pipeline = GroupingPipeline::from_config(&config)?;

    info!(
        template = %config.grouper.file_name_template,
        max_records_per_file = config.grouper.max_records_per_file,
        backend = %config.storage.backend,
        "Grouping records"
    );

    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input: {}", path.display()))?;
            pipeline.run(tokio::io::BufReader::new(file)).await
        }
        None => pipeline.run(tokio::io::BufReader::new(tokio::io::stdin())).await,
    }
}

/// Render the key a head record at `offset` would open right now
pub fn render_key(
    config: &RuntimeConfig,
    topic: &str,
    partition: i32,
    offset: i64,
) -> Result<String> {
    let template = config.grouper.template()?;
    let now = config.grouper.build_timestamp_source()?.time();
    template
        .render(&key_bindings(topic, partition, offset, now))
        .with_context(|| format!("Failed to render template '{}'", template))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_key_uses_configured_template() {
        let mut config = RuntimeConfig::default();
        config.grouper.file_name_template =
            "{{topic}}-{{partition}}-{{start_offset:padding=true}}".to_string();

        assert_eq!(
            render_key(&config, "orders", 2, 77).unwrap(),
            "orders-2-00000000000000000077"
        );
    }

    #[test]
    fn test_render_key_reports_bad_template() {
        let mut config = RuntimeConfig::default();
        config.grouper.file_name_template = "{{topic".to_string();
        assert!(render_key(&config, "orders", 0, 0).is_err());
    }
}
