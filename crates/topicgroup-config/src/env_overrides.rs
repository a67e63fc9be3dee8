use super::{FsConfig, LogFormat, RuntimeConfig, StorageBackend};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "TOPICGROUP_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the TOPICGROUP_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Grouper configuration
    if let Some(template) = get_env_string(env, "FILE_NAME_TEMPLATE")? {
        config.grouper.file_name_template = template;
    }
    if let Some(val) = get_env_usize(env, "MAX_RECORDS_PER_FILE")? {
        config.grouper.max_records_per_file = val;
    }
    if let Some(zone) = get_env_string(env, "TIMESTAMP_TIMEZONE")? {
        config.grouper.timestamp_timezone = zone;
    }
    if let Some(source) = get_env_string(env, "TIMESTAMP_SOURCE")? {
        config.grouper.timestamp_source = source;
    }

    // Flush cadence
    if let Some(val) = get_env_usize(env, "FLUSH_EVERY_RECORDS")? {
        config.flush.every_records = val;
    }

    // Storage backend
    if let Some(backend) = get_env_string(env, "STORAGE_BACKEND")? {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid TOPICGROUP_STORAGE_BACKEND value")?;
    }
    if let Some(path) = get_env_string(env, "STORAGE_PATH")? {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }
    if let Some(prefix) = get_env_string(env, "STORAGE_PREFIX")? {
        config.storage.prefix = normalize_prefix(prefix);
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key))
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Empty prefixes become `None`; others end with a single trailing '/'
pub fn normalize_prefix(prefix: String) -> Option<String> {
    if prefix.is_empty() {
        None
    } else if prefix.ends_with('/') {
        Some(prefix)
    } else {
        Some(format!("{}/", prefix))
    }
}
