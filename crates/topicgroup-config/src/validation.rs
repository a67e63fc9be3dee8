// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use topicgroup_core::TemplateVariable;
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_grouper_config(&config.grouper)?;
    validate_storage_config(&config.storage)?;
    validate_log_config(&config.log)?;
    Ok(())
}

fn validate_grouper_config(config: &GrouperConfig) -> Result<()> {
    let template = config.template()?;

    for variable in [
        TemplateVariable::Topic,
        TemplateVariable::Partition,
        TemplateVariable::StartOffset,
    ] {
        if !template.has_variable(variable.name()) {
            bail!(
                "grouper.file_name_template must contain {{{{{}}}}}: {}",
                variable,
                config.file_name_template
            );
        }
    }

    for name in template.variable_names() {
        if TemplateVariable::from_name(name).is_none() {
            bail!(
                "grouper.file_name_template references unsupported variable '{}'",
                name
            );
        }
    }
    template.check_parameters()?;

    config.timezone()?;
    config.timestamp_source_type()?;

    // Warn about very large batch sizes
    if config.max_records_per_file > 10_000_000 {
        warn!(
            max_records_per_file = config.max_records_per_file,
            "grouper.max_records_per_file is very large; may cause memory issues"
        );
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.path.is_empty() {
                bail!("storage.fs.path must not be empty");
            }
        }
        StorageBackend::Memory => {}
    }

    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<()> {
    if config.level.is_empty() {
        bail!("log.level must not be empty");
    }
    Ok(())
}
